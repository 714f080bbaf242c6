//! Blocking HTTP client.
//!
//! # Design
//! `HttpClient` holds only its transport factory. Every call builds a fresh
//! transport, runs `execute_request` on the calling thread and maps the
//! `Outcome` to a `Result`. Calls block for up to the configured timeouts,
//! so this is for threads where blocking is acceptable. `AsyncHttpClient`
//! covers the rest.

use std::sync::Arc;

use tracing::debug;

use crate::config::TransportConfig;
use crate::error::{ClientError, ConfigError};
use crate::execute::{execute_request, Outcome};
use crate::http::{Params, Request};
use crate::transport::{TransportFactory, UreqTransportFactory};

/// Synchronous GET/POST client.
#[derive(Clone)]
pub struct HttpClient {
    factory: Arc<dyn TransportFactory>,
}

impl HttpClient {
    /// A client using the default, trust-all configuration.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_factory(Arc::new(UreqTransportFactory::new(config)?)))
    }

    pub fn with_factory(factory: Arc<dyn TransportFactory>) -> Self {
        Self { factory }
    }

    /// GET `uri` with `params` appended to its query string.
    pub fn get(&self, uri: &str, params: Option<&Params>) -> Result<Vec<u8>, ClientError> {
        self.execute(&Request::get(uri, params))
    }

    /// POST `params` to `uri` as a URL-encoded form.
    pub fn post(&self, uri: &str, params: Option<&Params>) -> Result<Vec<u8>, ClientError> {
        self.execute(&Request::post(uri, params))
    }

    pub fn execute(&self, request: &Request) -> Result<Vec<u8>, ClientError> {
        debug!(method = %request.method(), uri = request.uri(), "executing request");
        let mut transport = self.factory.create()?;
        into_result(execute_request(transport.as_mut(), request))
    }
}

fn into_result(outcome: Outcome) -> Result<Vec<u8>, ClientError> {
    match outcome {
        Outcome::Success(body) => Ok(body),
        Outcome::HttpError(status) => Err(ClientError::Status { status }),
        Outcome::TransportError(e) => Err(ClientError::Transport(e)),
    }
}
