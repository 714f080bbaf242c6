//! Minimal blocking and callback-driven HTTP client.
//!
//! # Overview
//! Performs GET and POST requests either on the calling thread
//! (`HttpClient`) or on a worker thread with the result handed back to the
//! submitting thread's `HomeLoop` (`AsyncHttpClient`). Bodies are fully
//! buffered and gzip responses are decoded transparently.
//!
//! # Design
//! - A fresh `Transport` is created by a `TransportFactory` for every request
//!   and shut down once that request finishes, whatever the outcome.
//! - `execute_request` is the single execute-and-classify path. It turns a
//!   round-trip into an `Outcome` that both clients map to their own result
//!   shape.
//! - Async results travel as one queued task per request, so a listener sees
//!   exactly one callback.
//!
//! # Security
//! The default `TlsPolicy::TrustAll` accepts any certificate chain and any
//! hostname. That makes self-signed and test endpoints reachable, and offers
//! no protection against interception. Use `TlsPolicy::Verified` anywhere
//! that matters.

pub mod async_client;
pub mod client;
pub mod config;
pub mod error;
pub mod execute;
pub mod home;
pub mod http;
pub mod listener;
pub mod transport;

pub use async_client::{AsyncHttpClient, RequestId};
pub use client::HttpClient;
pub use config::{TlsPolicy, TransportConfig};
pub use error::{ClientError, ConfigError, TransportError};
pub use execute::{execute_request, Outcome};
pub use home::{HomeHandle, HomeLoop};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Params, Request};
pub use listener::{callbacks, BoxedListener, HttpEventListener};
pub use transport::{Scheme, Transport, TransportFactory, UreqTransport, UreqTransportFactory};
