//! Error types for the HTTP client.
//!
//! # Design
//! `ConfigError` is fatal: it means the configuration can never produce a
//! working transport, so it is reported when a client is built rather than
//! per request. `TransportError` covers everything that can go wrong during
//! one round-trip short of the server answering with a non-2xx status.
//! `ClientError` is what the blocking client returns. A non-2xx status
//! becomes `Status`, and transport failures keep their cause reachable
//! through `source()`.

use std::io;

use thiserror::Error;

/// The transport configuration can never yield a working client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid user agent `{0}`")]
    InvalidUserAgent(String),

    #[error("{name} timeout must be non-zero")]
    ZeroTimeout { name: &'static str },
}

/// A request failed before a usable response was fully received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request uri `{uri}`: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported uri scheme `{0}`")]
    UnsupportedScheme(String),

    /// Connect, DNS, TLS, timeout and protocol failures from the transport.
    #[error("{0}")]
    Network(#[from] ureq::Error),

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("failed to decompress gzip response body: {0}")]
    Decompress(#[source] io::Error),

    #[error("transport configuration rejected: {0}")]
    Configuration(#[from] ConfigError),

    #[error("transport used after shutdown")]
    Shutdown,

    /// The worker executing the request panicked.
    #[error("request worker panicked: {0}")]
    Panicked(String),
}

impl TransportError {
    /// Classify an error raised while reading a response body.
    ///
    /// ureq reports body failures as `io::Error`s wrapping its own error;
    /// those are unwrapped into `Network`.
    pub fn from_body_read(e: io::Error) -> Self {
        if e.get_ref().is_some_and(|inner| inner.is::<ureq::Error>()) {
            TransportError::Network(ureq::Error::from(e))
        } else {
            TransportError::Io(e)
        }
    }

    /// Whether the failure was a connect or read timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Network(ureq::Error::Timeout(_)) => true,
            TransportError::Network(ureq::Error::Io(e)) | TransportError::Io(e) => io_is_timeout(e),
            _ => false,
        }
    }
}

fn io_is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        || e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<ureq::Error>())
            .is_some_and(|inner| matches!(inner, ureq::Error::Timeout(_)))
}

/// Errors returned by `HttpClient` and by async request submission.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a status outside 200-299.
    #[error("server responded status {status}")]
    Status { status: u16 },

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Configuration(#[from] ConfigError),

    /// Async submission from a thread with no `HomeLoop`.
    #[error("no home loop is attached to the calling thread")]
    NoHomeContext,

    #[error("failed to spawn request worker: {0}")]
    Spawn(#[source] io::Error),
}

impl ClientError {
    /// The HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status } => Some(*status),
            _ => None,
        }
    }
}
