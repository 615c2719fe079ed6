//! Awaiting another computation for its result.

use std::{
    future::{Future, IntoFuture},
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    error::Fault,
    frame::{self, Suspend},
    handle::Unique,
    promise::{Continuation, Kind},
};

/// Shared state machine of [`Delegate`] and [`Join`].
///
/// Installs the awaiting frame as the target's continuation and transfers to
/// the target. The target's finish hands control straight back.
#[derive(Debug)]
struct Delegation<K: Kind> {
    task: Unique<K>,
    suspended: bool,
}

impl<K: Kind> Delegation<K>
where
    K::Finish: Continuation,
{
    fn poll_finished(&mut self) -> Poll<Result<K::Output, Fault>> {
        if self.task.done() {
            return Poll::Ready(self.outcome());
        }
        self.task.set_continuation(frame::current());
        if self.suspended {
            // Resumed by hand before the target finished: wait again.
            return Poll::Pending;
        }
        if !frame::request(Suspend::Transfer(self.task.handle())) {
            return Poll::Pending;
        }
        self.suspended = true;
        Poll::Pending
    }

    fn outcome(&mut self) -> Result<K::Output, Fault> {
        self.task.rethrow()?;
        self.task
            .take_result()
            .ok_or_else(|| Fault::new("delegated computation produced no result"))
    }
}

/// Awaiter that runs another computation and evaluates to its result.
///
/// A fault in the target is re-raised in the awaiting body. Produced by
/// awaiting a [`Unique`] directly.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Delegate<K: Kind> {
    inner: Delegation<K>,
}

impl<K: Kind> Delegate<K> {
    pub fn new(task: Unique<K>) -> Self {
        Self {
            inner: Delegation {
                task,
                suspended: false,
            },
        }
    }
}

impl<K: Kind> Future for Delegate<K>
where
    K::Finish: Continuation,
{
    type Output = K::Output;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<K::Output> {
        match self.inner.poll_finished() {
            Poll::Ready(Ok(output)) => Poll::Ready(output),
            Poll::Ready(Err(fault)) => fault.raise(),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Like [`Delegate`], but hands a fault in the target back as a value instead
/// of re-raising it.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Join<K: Kind> {
    inner: Delegation<K>,
}

impl<K: Kind> Future for Join<K>
where
    K::Finish: Continuation,
{
    type Output = Result<K::Output, Fault>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_finished()
    }
}

impl<K: Kind> IntoFuture for Unique<K>
where
    K::Finish: Continuation,
{
    type Output = K::Output;
    type IntoFuture = Delegate<K>;

    fn into_future(self) -> Delegate<K> {
        Delegate::new(self)
    }
}

impl<K: Kind> Unique<K>
where
    K::Finish: Continuation,
{
    /// Await the computation, receiving a fault as a value.
    pub fn join(self) -> Join<K> {
        Join {
            inner: Delegation {
                task: self,
                suspended: false,
            },
        }
    }
}
