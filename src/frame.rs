//! Frames and the trampoline that drives them.
//!
//! A frame is the heap allocation behind a computation: its promise, its
//! pinned body, and the bookkeeping needed to suspend and resume it. Frames
//! never call each other directly. When a body suspends, the awaiter that
//! suspended it leaves a [`Suspend`] request on the running frame; once the
//! poll returns, the trampoline reads the request and decides which frame runs
//! next. Control transfer between frames is therefore a loop, not recursion.

use std::{
    cell::{Cell, RefCell},
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
};

use futures::task::noop_waker_ref;

use crate::{
    error::Fault,
    handle::Handle,
    promise::{FaultPolicy, FinishPolicy, Kind, Promise},
};

pub(crate) type Body<T> = Pin<Box<dyn Future<Output = T>>>;

/// Where control goes once the current poll returns.
#[derive(Debug, Default)]
pub(crate) enum Suspend {
    /// Back to whoever resumed the frame.
    #[default]
    Return,
    /// To another frame; the current one stays resumable.
    Transfer(Handle),
    /// Tear the current frame down, then run the target.
    Destroy(Handle),
}

/// How a run of the trampoline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Control came back through a yield, a pause, or a finished frame.
    Returned,
    /// The last frame parked until something else resumes it, such as a
    /// callback completion or a barrier release.
    Parked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Suspended,
    Running,
    Done,
    Destroyed,
}

/// The part of a frame that does not depend on its kind.
pub(crate) trait RawFrame {
    fn id(&self) -> u64;

    fn is_done(&self) -> bool;

    /// Poll the body once and return the frame that runs next.
    fn step(self: Rc<Self>) -> (Handle, Outcome);

    fn request(&self, suspend: Suspend);

    fn rethrow(&self) -> Result<(), Fault>;

    /// Drop the body and any self-ownership.
    fn destroy(&self);
}

pub(crate) struct Frame<K: Kind> {
    pub(crate) promise: Promise<K>,
    id: u64,
    body: RefCell<Option<Body<K::Output>>>,
    state: Cell<State>,
    request: RefCell<Suspend>,
    keep_alive: RefCell<Option<Rc<dyn RawFrame>>>,
}

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
    static CURRENT: RefCell<Vec<Handle>> = const { RefCell::new(Vec::new()) };
}

/// Marks a frame as the one being polled for as long as it lives.
struct Enter;

impl Enter {
    fn new(handle: Handle) -> Self {
        CURRENT.with(|current| current.borrow_mut().push(handle));
        Enter
    }
}

impl Drop for Enter {
    fn drop(&mut self) {
        CURRENT.with(|current| current.borrow_mut().pop());
    }
}

/// The frame being polled, or an empty handle outside of any frame.
pub(crate) fn current() -> Handle {
    CURRENT.with(|current| current.borrow().last().cloned().unwrap_or_default())
}

/// Leave a suspend request on the frame being polled.
///
/// Returns `false` when no frame is being polled.
pub(crate) fn request(suspend: Suspend) -> bool {
    match current().frame() {
        Some(frame) => {
            frame.request(suspend);
            true
        }
        None => {
            tracing::warn!("await primitive polled outside of any frame");
            false
        }
    }
}

/// Run frames until control returns to the caller.
pub(crate) fn run(start: Handle) -> Outcome {
    let mut next = start;
    let mut outcome = Outcome::Returned;
    while let Some(frame) = next.frame() {
        (next, outcome) = frame.step();
    }
    outcome
}

impl<K: Kind> Frame<K> {
    pub(crate) fn new(body: Body<K::Output>) -> Self {
        let id = NEXT_ID.with(|next| next.replace(next.get() + 1));
        Self {
            promise: Promise::default(),
            id,
            body: RefCell::new(Some(body)),
            state: Cell::new(State::Created),
            request: RefCell::new(Suspend::Return),
            keep_alive: RefCell::new(None),
        }
    }

    pub(crate) fn handle(this: &Rc<Self>) -> Handle {
        let weak: Weak<Self> = Rc::downgrade(this);
        let weak: Weak<dyn RawFrame> = weak;
        Handle::from_weak(weak)
    }

    /// Make the frame own itself until it is destroyed.
    pub(crate) fn detach(this: &Rc<Self>) {
        if this.is_done() {
            return;
        }
        let me: Rc<dyn RawFrame> = Rc::clone(this) as Rc<dyn RawFrame>;
        this.keep_alive.replace(Some(me));
    }

    pub(crate) fn is_started(&self) -> bool {
        self.state.get() != State::Created
    }

    fn park(&self, body: Body<K::Output>) {
        self.body.replace(Some(body));
        self.state.set(State::Suspended);
    }

    fn complete(&self) -> Handle {
        self.state.set(State::Done);
        match self.promise.finish.final_suspend() {
            Some(next) => {
                tracing::trace!(frame = self.id, "frame finished");
                next
            }
            None => {
                tracing::trace!(frame = self.id, "frame finished, tearing down");
                self.destroy();
                Handle::empty()
            }
        }
    }
}

impl<K: Kind> RawFrame for Frame<K> {
    fn id(&self) -> u64 {
        self.id
    }

    fn is_done(&self) -> bool {
        matches!(self.state.get(), State::Done | State::Destroyed)
    }

    fn step(self: Rc<Self>) -> (Handle, Outcome) {
        match self.state.get() {
            State::Created | State::Suspended => {}
            State::Running => {
                tracing::warn!(frame = self.id, "resume of a running frame ignored");
                return (Handle::empty(), Outcome::Returned);
            }
            State::Done | State::Destroyed => {
                tracing::warn!(frame = self.id, "resume of a finished frame ignored");
                return (Handle::empty(), Outcome::Returned);
            }
        }
        let Some(mut body) = self.body.borrow_mut().take() else {
            return (Handle::empty(), Outcome::Returned);
        };

        tracing::trace!(frame = self.id, "resuming frame");
        self.state.set(State::Running);
        self.request.replace(Suspend::Return);
        let polled = {
            let _enter = Enter::new(Frame::handle(&self));
            let mut cx = Context::from_waker(noop_waker_ref());
            panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx)))
        };

        if self.state.get() == State::Destroyed {
            // Torn down from inside its own body; nothing left to park.
            drop(body);
            let next = match (polled, self.request.take()) {
                (Ok(Poll::Pending), Suspend::Transfer(next) | Suspend::Destroy(next)) => next,
                _ => Handle::empty(),
            };
            return (next, Outcome::Returned);
        }

        let next = match polled {
            Ok(Poll::Pending) => match self.request.take() {
                Suspend::Return => {
                    self.park(body);
                    tracing::trace!(frame = self.id, "frame suspended");
                    return (Handle::empty(), Outcome::Parked);
                }
                Suspend::Transfer(next) => {
                    self.park(body);
                    tracing::trace!(frame = self.id, next = ?next, "frame transferred control");
                    next
                }
                Suspend::Destroy(next) => {
                    tracing::trace!(frame = self.id, next = ?next, "frame tearing down for handoff");
                    drop(body);
                    self.destroy();
                    next
                }
            },
            Ok(Poll::Ready(output)) => {
                drop(body);
                self.promise.result.capture(output);
                self.complete()
            }
            Err(payload) => {
                drop(body);
                K::Faults::capture(&self.promise.faults, Fault::from_panic(payload));
                self.complete()
            }
        };
        (next, Outcome::Returned)
    }

    fn request(&self, suspend: Suspend) {
        self.request.replace(suspend);
    }

    fn rethrow(&self) -> Result<(), Fault> {
        self.promise.rethrow()
    }

    fn destroy(&self) {
        self.state.set(State::Destroyed);
        let body = self.body.borrow_mut().take();
        drop(body);
        drop(self.promise.result.release());
        let keep_alive = self.keep_alive.borrow_mut().take();
        drop(keep_alive);
    }
}
