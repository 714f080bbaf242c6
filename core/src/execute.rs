//! The execute-and-classify step shared by both clients.
//!
//! # Design
//! `execute_request` runs one request to completion on the calling thread
//! and reduces everything that can happen into an `Outcome`. Only a 2xx
//! response has its body read (and gunzipped); any other status is reported
//! by code alone. The transport is shut down on every exit path, unwinding
//! included, by a drop guard.

use std::io::{self, Read};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpResponse, Request};
use crate::transport::Transport;

/// Result of executing one request. Exactly one is produced per request.
#[derive(Debug)]
pub enum Outcome {
    /// 2xx response with its fully buffered, decompressed body.
    Success(Vec<u8>),
    /// Any status outside 200-299. The body is not read.
    HttpError(u16),
    /// No usable response: network, I/O or decompression failure.
    TransportError(TransportError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Calls `Transport::shutdown` when dropped.
struct ShutdownGuard<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
}

impl<T: Transport + ?Sized> Drop for ShutdownGuard<'_, T> {
    fn drop(&mut self) {
        self.transport.shutdown();
    }
}

/// Execute `request` on `transport` and classify the result.
///
/// Blocks until the round-trip completes or the transport times out.
/// `transport` is shut down before this returns.
pub fn execute_request<T: Transport + ?Sized>(transport: &mut T, request: &Request) -> Outcome {
    let guard = ShutdownGuard { transport };

    let http_request = match request.to_http() {
        Ok(r) => r,
        Err(e) => return Outcome::TransportError(e),
    };

    let response = match guard.transport.execute(&http_request) {
        Ok(r) => r,
        Err(e) => {
            debug!(method = %request.method(), uri = request.uri(), error = %e, "request failed");
            return Outcome::TransportError(e);
        }
    };

    let status = response.status;
    if status / 100 != 2 {
        debug!(method = %request.method(), uri = request.uri(), status, "non-success status");
        return Outcome::HttpError(status);
    }

    match read_body(response) {
        Ok(body) => {
            debug!(method = %request.method(), uri = request.uri(), status, len = body.len(), "request completed");
            Outcome::Success(body)
        }
        Err(e) => {
            debug!(method = %request.method(), uri = request.uri(), error = %e, "failed reading body");
            Outcome::TransportError(e)
        }
    }
}

/// Buffer the whole body, gunzipping it when the response says so.
fn read_body(response: HttpResponse) -> Result<Vec<u8>, TransportError> {
    let gzip = response.is_gzip();
    let mut body = Vec::new();
    if gzip {
        let mut decoder = GzDecoder::new(SourceReader::new(response.body));
        if let Err(e) = decoder.read_to_end(&mut body) {
            // A failed source read surfaces through the decoder; it is not a gzip error.
            return Err(match decoder.get_mut().failure.take() {
                Some(source) => TransportError::from_body_read(source),
                None => TransportError::Decompress(e),
            });
        }
    } else {
        let mut reader = response.body;
        reader.read_to_end(&mut body).map_err(TransportError::from_body_read)?;
    }
    Ok(body)
}

/// Remembers the first error raised by the wrapped body reader.
struct SourceReader<R> {
    inner: R,
    failure: Option<io::Error>,
}

impl<R> SourceReader<R> {
    fn new(inner: R) -> Self {
        SourceReader { inner, failure: None }
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                let relayed = io::Error::new(e.kind(), e.to_string());
                self.failure = Some(e);
                Err(relayed)
            }
        }
    }
}
