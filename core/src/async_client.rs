//! Non-blocking HTTP client with results delivered to a home loop.
//!
//! # Design
//! Submitting a request captures the caller's `HomeHandle`, packs it with
//! the request and listener into a `PendingRequest`, and moves that onto a
//! fresh worker thread. No state is shared between requests. The worker
//! runs `execute_request`, turns the `Outcome` into a `Delivery` and posts
//! a single task home, and that task invokes the listener. A panic on the
//! worker still produces a delivery.
//!
//! Transport failures reach `on_error` with status 200 (HTTP OK) and the
//! failure as `cause`. Existing callers depend on that status, so it stays.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tracing::{debug, debug_span, trace};
use uuid::Uuid;

use crate::config::TransportConfig;
use crate::error::{ClientError, ConfigError, TransportError};
use crate::execute::{execute_request, Outcome};
use crate::home::HomeHandle;
use crate::http::{Params, Request};
use crate::listener::BoxedListener;
use crate::transport::{TransportFactory, UreqTransportFactory};

/// Status reported alongside a transport failure.
pub const TRANSPORT_FAILURE_STATUS: u16 = 200;

/// Identifies one submitted request in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The message a worker posts home.
#[derive(Debug)]
enum Delivery {
    Complete(Vec<u8>),
    Status(u16),
    Failed { status: u16, cause: TransportError },
}

impl From<Outcome> for Delivery {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(body) => Delivery::Complete(body),
            Outcome::HttpError(status) => Delivery::Status(status),
            Outcome::TransportError(cause) => Delivery::Failed {
                status: TRANSPORT_FAILURE_STATUS,
                cause,
            },
        }
    }
}

impl Delivery {
    fn kind(&self) -> &'static str {
        match self {
            Delivery::Complete(_) => "complete",
            Delivery::Status(_) => "status",
            Delivery::Failed { .. } => "failed",
        }
    }

    fn deliver(self, id: RequestId, listener: Option<BoxedListener>) {
        let Some(listener) = listener else {
            trace!(request_id = %id, "no listener, dropping result");
            return;
        };
        match self {
            Delivery::Complete(body) => listener.on_complete(body),
            Delivery::Status(status) => listener.on_error(status, None),
            Delivery::Failed { status, cause } => listener.on_error(status, Some(cause)),
        }
    }
}

/// Everything a worker needs to run and report one request.
struct PendingRequest {
    id: RequestId,
    request: Request,
    home: HomeHandle,
    listener: Option<BoxedListener>,
}

impl PendingRequest {
    fn run(self, factory: &dyn TransportFactory) {
        let PendingRequest {
            id,
            request,
            home,
            listener,
        } = self;
        let _span = debug_span!("request", request_id = %id).entered();

        let outcome = catch_unwind(AssertUnwindSafe(|| execute_with(factory, &request)))
            .unwrap_or_else(|payload| {
                Outcome::TransportError(TransportError::Panicked(panic_message(payload.as_ref())))
            });
        let delivery = Delivery::from(outcome);
        debug!(kind = delivery.kind(), "posting result home");

        if !home.post(move || delivery.deliver(id, listener)) {
            debug!("home loop is gone, result dropped");
        }
    }
}

fn execute_with(factory: &dyn TransportFactory, request: &Request) -> Outcome {
    match factory.create() {
        Ok(mut transport) => execute_request(transport.as_mut(), request),
        Err(e) => Outcome::TransportError(e.into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// GET/POST client that never blocks the caller.
///
/// Results are delivered to the `HomeLoop` of the submitting thread and
/// only run when that loop processes its queue.
#[derive(Clone)]
pub struct AsyncHttpClient {
    factory: Arc<dyn TransportFactory>,
}

impl AsyncHttpClient {
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

    /// GET `uri` in the background. See `execute`.
    pub fn get(
        &self,
        uri: &str,
        params: Option<&Params>,
        listener: Option<BoxedListener>,
    ) -> Result<RequestId, ClientError> {
        self.execute(Request::get(uri, params), listener)
    }

    /// POST a form to `uri` in the background. See `execute`.
    pub fn post(
        &self,
        uri: &str,
        params: Option<&Params>,
        listener: Option<BoxedListener>,
    ) -> Result<RequestId, ClientError> {
        self.execute(Request::post(uri, params), listener)
    }

    /// Run `request` on a worker thread and deliver the result to the
    /// calling thread's home loop.
    ///
    /// Fails immediately with `NoHomeContext` if the thread has no
    /// `HomeLoop`, or `Spawn` if no worker could be started; otherwise
    /// exactly one listener callback will be queued on the home loop.
    pub fn execute(
        &self,
        request: Request,
        listener: Option<BoxedListener>,
    ) -> Result<RequestId, ClientError> {
        let home = HomeHandle::current().ok_or(ClientError::NoHomeContext)?;
        self.execute_on(home, request, listener)
    }

    /// Like `execute`, delivering to an explicit home loop.
    pub fn execute_on(
        &self,
        home: HomeHandle,
        request: Request,
        listener: Option<BoxedListener>,
    ) -> Result<RequestId, ClientError> {
        let id = RequestId(Uuid::new_v4());
        debug!(request_id = %id, method = %request.method(), uri = request.uri(), "submitting request");

        let pending = PendingRequest {
            id,
            request,
            home,
            listener,
        };
        let factory = Arc::clone(&self.factory);
        thread::Builder::new()
            .name("http-worker".to_string())
            .spawn(move || pending.run(factory.as_ref()))
            .map_err(ClientError::Spawn)?;
        Ok(id)
    }
}
