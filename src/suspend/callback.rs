//! Bridging callback-style APIs into bodies.

use std::{
    cell::RefCell,
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use crate::{
    frame::{self, Suspend},
    handle::Handle,
};

struct Shared<A> {
    result: RefCell<Option<A>>,
    waiter: RefCell<Handle>,
}

/// Awaiter for a callback-style registration.
///
/// The registration function runs as soon as the awaiter is created and
/// receives a [`Completion`]. Firing the completion stores its arguments and
/// resumes the awaiting frame. A completion fired during registration makes
/// the await ready without suspending.
///
/// `A` is what the await evaluates to: `()` for no arguments, the argument
/// itself for one, a tuple for several.
#[must_use = "futures do nothing unless awaited"]
pub struct Callback<A> {
    shared: Rc<Shared<A>>,
    suspended: bool,
}

impl<A> Callback<A> {
    pub fn new<F>(register: F) -> Self
    where
        F: FnOnce(Completion<A>),
    {
        let shared = Rc::new(Shared {
            result: RefCell::new(None),
            waiter: RefCell::new(Handle::empty()),
        });
        register(Completion {
            shared: Some(Rc::clone(&shared)),
        });
        Self {
            shared,
            suspended: false,
        }
    }
}

impl<A> Future for Callback<A> {
    type Output = A;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<A> {
        if let Some(result) = self.shared.result.borrow_mut().take() {
            return Poll::Ready(result);
        }
        if !self.suspended {
            self.shared.waiter.replace(frame::current());
            if !frame::request(Suspend::Return) {
                return Poll::Pending;
            }
            self.suspended = true;
        }
        Poll::Pending
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("ready", &self.shared.result.borrow().is_some())
            .field("waiter", &*self.shared.waiter.borrow())
            .finish()
    }
}

/// One-shot completion token passed to a [`Callback`] registration.
pub struct Completion<A> {
    shared: Option<Rc<Shared<A>>>,
}

impl<A> Completion<A> {
    /// Deliver the arguments and resume the awaiting frame, if it has
    /// suspended.
    pub fn complete(mut self, args: A) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        shared.result.replace(Some(args));
        let waiter = shared.waiter.take();
        drop(shared);
        frame::run(waiter);
    }
}

impl<A> Drop for Completion<A> {
    fn drop(&mut self) {
        if self.shared.is_some() {
            tracing::warn!("callback completion dropped without firing");
        }
    }
}

impl<A> fmt::Debug for Completion<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("fired", &self.shared.is_none())
            .finish()
    }
}
