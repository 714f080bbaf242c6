//! Callbacks for async requests.

use crate::error::TransportError;

/// Receives the result of one async request on its home thread.
///
/// Both methods consume the listener, so at most one of them can ever run.
pub trait HttpEventListener {
    /// The request completed with a 2xx status. `body` may be empty.
    fn on_complete(self: Box<Self>, body: Vec<u8>);

    /// The request failed.
    ///
    /// For a non-2xx response `status` is that status and `cause` is `None`.
    /// For a transport failure `cause` is set and `status` is 200 (HTTP OK),
    /// even though no successful response was received. Check `cause` first
    /// to tell the two apart.
    fn on_error(self: Box<Self>, status: u16, cause: Option<TransportError>);
}

pub type BoxedListener = Box<dyn HttpEventListener + Send>;

/// A listener built from two closures.
pub struct Callbacks<C, E> {
    on_complete: C,
    on_error: E,
}

/// Adapt a pair of closures into a listener.
pub fn callbacks<C, E>(on_complete: C, on_error: E) -> BoxedListener
where
    C: FnOnce(Vec<u8>) + Send + 'static,
    E: FnOnce(u16, Option<TransportError>) + Send + 'static,
{
    Box::new(Callbacks {
        on_complete,
        on_error,
    })
}

impl<C, E> HttpEventListener for Callbacks<C, E>
where
    C: FnOnce(Vec<u8>),
    E: FnOnce(u16, Option<TransportError>),
{
    fn on_complete(self: Box<Self>, body: Vec<u8>) {
        let Callbacks { on_complete, .. } = *self;
        on_complete(body)
    }

    fn on_error(self: Box<Self>, status: u16, cause: Option<TransportError>) {
        let Callbacks { on_error, .. } = *self;
        on_error(status, cause)
    }
}
