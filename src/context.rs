//! The body context: yielding, delegated yielding and pausing.

use std::{
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
};

use crate::{
    frame::{self, Frame, Suspend},
    handle::{Handle, Unique},
    iter::Cursor,
    promise::{Continuation, DelegatingYield, FinishPolicy, Item, Kind, Yields},
};

/// Body context for computations that need to reach their own frame.
///
/// Kinds with a yield capability hand one of these to their body; it is how
/// the body yields values and delegates to nested generators.
pub struct Co<K: Kind> {
    frame: Weak<Frame<K>>,
}

impl<K: Kind> Clone for Co<K> {
    fn clone(&self) -> Self {
        Self {
            frame: Weak::clone(&self.frame),
        }
    }
}

impl<K: Kind> Co<K> {
    pub(crate) fn new(frame: Weak<Frame<K>>) -> Self {
        Self { frame }
    }

    /// A handle to the frame running this body.
    pub fn handle(&self) -> Handle {
        self.frame
            .upgrade()
            .map_or_else(Handle::empty, |frame| Frame::handle(&frame))
    }

    /// Pause without producing a value, handing control to the frame's
    /// intermediate continuation.
    pub fn pause(&self) -> Pause<'_, K> {
        Pause {
            co: self,
            suspended: false,
        }
    }
}

impl<K: Kind> Co<K>
where
    K::Yield: Yields,
{
    /// Produce one value and suspend.
    pub fn yield_(&self, value: Item<K>) -> YieldValue<'_, K> {
        YieldValue {
            co: self,
            value: Some(value),
            suspended: false,
        }
    }
}

impl<Y: 'static, const ASYNC: bool, K> Co<K>
where
    K: Kind<Yield = DelegatingYield<Y, ASYNC>>,
{
    /// Produce every value of a nested generator, then evaluate to its result.
    ///
    /// An iterator pulling from this frame pulls from the nested one until it
    /// finishes.
    pub fn yield_from<N>(&self, nested: Unique<N>) -> YieldFrom<'_, K, N>
    where
        N: Kind,
        N::Finish: Continuation,
        N::Yield: Yields<Item = Y>,
    {
        YieldFrom {
            co: self,
            nested,
            cursor: None,
            suspended: false,
        }
    }
}

/// Hand control to `next` from the frame being polled.
///
/// Returns `false` if there was nowhere to go and the caller should carry on.
fn suspend_to(next: Handle) -> bool {
    if next.is_empty() {
        return false;
    }
    frame::request(Suspend::Transfer(next))
}

/// Awaiter returned by [`Co::pause`].
pub struct Pause<'a, K: Kind> {
    co: &'a Co<K>,
    suspended: bool,
}

impl<K: Kind> Future for Pause<'_, K> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.suspended {
            return Poll::Ready(());
        }
        let Some(frame) = self.co.frame.upgrade() else {
            return Poll::Ready(());
        };
        if !suspend_to(frame.promise.finish.intermediate_suspend()) {
            return Poll::Ready(());
        }
        self.suspended = true;
        Poll::Pending
    }
}

/// Awaiter returned by [`Co::yield_`].
pub struct YieldValue<'a, K: Kind>
where
    K::Yield: Yields,
{
    co: &'a Co<K>,
    value: Option<Item<K>>,
    suspended: bool,
}

impl<K: Kind> Unpin for YieldValue<'_, K> where K::Yield: Yields {}

impl<K: Kind> Future for YieldValue<'_, K>
where
    K::Yield: Yields,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.suspended {
            return Poll::Ready(());
        }
        let Some(frame) = this.co.frame.upgrade() else {
            return Poll::Ready(());
        };
        if let Some(value) = this.value.take() {
            frame.promise.yielded.capture(value);
        }
        let next = if <K::Yield as Yields>::ASYNC {
            frame.promise.finish.intermediate_suspend()
        } else {
            Handle::noop()
        };
        if !suspend_to(next) {
            return Poll::Ready(());
        }
        this.suspended = true;
        Poll::Pending
    }
}

/// Awaiter returned by [`Co::yield_from`].
pub struct YieldFrom<'a, K: Kind, N: Kind>
where
    K::Yield: Yields,
{
    co: &'a Co<K>,
    nested: Unique<N>,
    cursor: Option<Rc<Cursor<Item<K>>>>,
    suspended: bool,
}

impl<K: Kind, N: Kind> Unpin for YieldFrom<'_, K, N> where K::Yield: Yields {}

impl<K, N> YieldFrom<'_, K, N>
where
    K: Kind,
    K::Yield: Yields,
    N: Kind,
    N::Finish: Continuation,
    N::Yield: Yields<Item = Item<K>>,
{
    fn finish(&mut self) -> N::Output {
        if let Some(cursor) = self.cursor.take() {
            if let Some(frame) = self.co.frame.upgrade() {
                Cursor::bind(&cursor, &frame);
            }
        }
        if let Err(fault) = self.nested.rethrow() {
            fault.raise();
        }
        match self.nested.take_result() {
            Some(output) => output,
            None => crate::Fault::new("delegated generator produced no result").raise(),
        }
    }
}

impl<K, N> Future for YieldFrom<'_, K, N>
where
    K: Kind,
    K::Yield: Yields,
    N: Kind,
    N::Finish: Continuation,
    N::Yield: Yields<Item = Item<K>>,
{
    type Output = N::Output;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<N::Output> {
        let this = self.get_mut();
        if this.nested.done() {
            return Poll::Ready(this.finish());
        }

        if !this.suspended {
            let Some(frame) = this.co.frame.upgrade() else {
                return Poll::Pending;
            };
            if let (Some(cursor), Some(nested)) = (frame.promise.yielded.attached(), this.nested.frame()) {
                Cursor::bind(&cursor, nested);
                this.cursor = Some(cursor);
            }
            this.suspended = true;
        }

        // Also reached when this frame is resumed by hand while the nested
        // generator is still running: forward the resumption to it.
        this.nested.set_continuation(frame::current());
        frame::request(Suspend::Transfer(this.nested.handle()));
        Poll::Pending
    }
}
