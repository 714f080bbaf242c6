//! Home execution context for async results.
//!
//! # Design
//! A `HomeLoop` is a task queue that only its owning thread drains, like a
//! UI event loop. Creating one makes it the thread's current home, which is
//! where `AsyncHttpClient` sends results for requests submitted from that
//! thread. Worker threads hold a `HomeHandle` (a queue sender) and post one
//! task per request. Once the loop is dropped, posting returns `false` and
//! drops the task.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

type Task = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    static CURRENT: RefCell<Option<HomeHandle>> = const { RefCell::new(None) };
}

/// Sends tasks to a `HomeLoop` from any thread.
#[derive(Clone)]
pub struct HomeHandle {
    sender: Sender<Task>,
}

impl HomeHandle {
    /// The home loop of the calling thread, if it has one.
    pub fn current() -> Option<HomeHandle> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Queue `task` to run on the home thread.
    ///
    /// Returns `false` if the loop no longer exists; the task is dropped.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        match self.sender.send(Box::new(task)) {
            Ok(()) => true,
            Err(_) => {
                trace!("home loop is gone, dropping task");
                false
            }
        }
    }

    /// Whether both handles feed the same loop.
    pub fn same_loop(&self, other: &HomeHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

/// A serialized, thread-bound task queue.
pub struct HomeLoop {
    handle: HomeHandle,
    receiver: Receiver<Task>,
    previous: Option<HomeHandle>,
    _thread_bound: PhantomData<Rc<()>>,
}

impl HomeLoop {
    /// Create a loop and make it the calling thread's current home.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        let handle = HomeHandle { sender };
        let previous = CURRENT.with(|current| current.replace(Some(handle.clone())));
        Self {
            handle,
            receiver,
            previous,
            _thread_bound: PhantomData,
        }
    }

    pub fn handle(&self) -> HomeHandle {
        self.handle.clone()
    }

    /// Run every task already queued. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Run tasks as they arrive until `count` have run or `timeout` passes.
    /// Returns how many ran.
    pub fn run_tasks(&self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;
        while ran < count {
            match self.receiver.recv_deadline(deadline) {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }
}

impl Default for HomeLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HomeLoop {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = CURRENT.try_with(|current| {
            let mut current = current.borrow_mut();
            if current.as_ref().is_some_and(|h| h.same_loop(&self.handle)) {
                *current = previous;
            }
        });
    }
}
