//! Handles to computations.
//!
//! [`Handle`] is a non-owning reference: it can resume a frame and ask whether
//! it is done, but never keeps the frame alive. [`Unique`] is the single owner
//! of a frame; dropping it discards the frame, and awaiting it delegates to the
//! computation.

use std::{
    fmt,
    future::Future,
    rc::{Rc, Weak},
};

use crate::{
    error::Fault,
    context::Co,
    frame::{self, Body, Frame, RawFrame},
    promise::{Continuation, Initiation, Kind, Promise},
};

/// A non-owning reference to a computation.
///
/// A handle is one of three things: empty, the no-op marker, or a reference
/// to a frame. Resuming the first two does nothing. A handle whose frame is
/// gone reads as done.
#[derive(Clone, Default)]
pub struct Handle {
    repr: Repr,
}

#[derive(Clone, Default)]
enum Repr {
    #[default]
    Empty,
    Noop,
    Frame(Weak<dyn RawFrame>),
}

impl Handle {
    /// A handle to nothing. As a continuation it means "return to the
    /// external scheduler".
    pub fn empty() -> Self {
        Self { repr: Repr::Empty }
    }

    /// The no-op marker: accepting control and immediately returning it to
    /// whoever resumed the current frame.
    pub fn noop() -> Self {
        Self { repr: Repr::Noop }
    }

    pub(crate) fn from_weak(frame: Weak<dyn RawFrame>) -> Self {
        Self {
            repr: Repr::Frame(frame),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.repr, Repr::Empty)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.repr, Repr::Noop)
    }

    /// Whether the computation has finished.
    ///
    /// The no-op marker never finishes; an empty handle or a destroyed frame
    /// always reads as finished.
    pub fn done(&self) -> bool {
        match &self.repr {
            Repr::Empty => true,
            Repr::Noop => false,
            Repr::Frame(frame) => frame.upgrade().is_none_or(|frame| frame.is_done()),
        }
    }

    /// Run the computation to its next suspension or completion, then hand
    /// back any fault it captured.
    pub fn resume(&self) -> Result<(), Fault> {
        frame::run(self.clone());
        self.frame().map_or(Ok(()), |frame| frame.rethrow())
    }

    /// Destroy the frame behind this handle.
    ///
    /// Meant for frames that own themselves (released or spawned). A frame
    /// that still has an owner stops running but its storage lives until the
    /// owner goes away.
    pub fn destroy(&self) {
        if let Some(frame) = self.frame() {
            frame.destroy();
        }
    }

    pub(crate) fn frame(&self) -> Option<Rc<dyn RawFrame>> {
        match &self.repr {
            Repr::Frame(frame) => frame.upgrade(),
            Repr::Empty | Repr::Noop => None,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Empty => f.write_str("Handle(empty)"),
            Repr::Noop => f.write_str("Handle(noop)"),
            Repr::Frame(frame) => match frame.upgrade() {
                Some(frame) => write!(f, "Handle(#{})", frame.id()),
                None => f.write_str("Handle(dangling)"),
            },
        }
    }
}

/// Anything that can name a computation to hand control to.
pub trait AsHandle {
    fn as_handle(&self) -> Handle;
}

impl AsHandle for Handle {
    fn as_handle(&self) -> Handle {
        self.clone()
    }
}

impl<K: Kind> AsHandle for Unique<K> {
    fn as_handle(&self) -> Handle {
        self.handle()
    }
}

/// Exclusive owner of a computation.
///
/// Move-only. Dropping a non-empty owner discards the frame: the remaining
/// body never runs, only the destructors of its locals do.
pub struct Unique<K: Kind> {
    frame: Option<Rc<Frame<K>>>,
}

impl<K: Kind> Default for Unique<K> {
    fn default() -> Self {
        Self { frame: None }
    }
}

impl<K: Kind> Unique<K> {
    /// Create a computation from a body that receives its context.
    ///
    /// Eager kinds run up to their first suspension before this returns.
    pub fn from_fn<F, Fut>(make: F) -> Self
    where
        F: FnOnce(Co<K>) -> Fut,
        Fut: Future<Output = K::Output> + 'static,
    {
        let unique = Self::build(make);
        if K::Initiation::EAGER {
            frame::run(unique.handle());
        }
        unique
    }

    /// Create the frame without starting it.
    pub(crate) fn build<F, Fut>(make: F) -> Self
    where
        F: FnOnce(Co<K>) -> Fut,
        Fut: Future<Output = K::Output> + 'static,
    {
        let frame = Rc::new_cyclic(|weak: &Weak<Frame<K>>| {
            let body: Body<K::Output> = Box::pin(make(Co::new(Weak::clone(weak))));
            Frame::new(body)
        });
        Self { frame: Some(frame) }
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    /// Whether the computation has finished. An empty owner reads as finished.
    pub fn done(&self) -> bool {
        self.frame.as_ref().is_none_or(|frame| frame.is_done())
    }

    /// Whether the body has begun running.
    pub fn is_started(&self) -> bool {
        self.frame.as_ref().is_some_and(|frame| frame.is_started())
    }

    /// A non-owning handle to the computation.
    pub fn handle(&self) -> Handle {
        self.frame.as_ref().map_or_else(Handle::empty, Frame::handle)
    }

    /// Run the computation to its next suspension or completion, then hand
    /// back any fault it captured.
    pub fn resume(&self) -> Result<(), Fault> {
        let Some(frame) = &self.frame else {
            return Ok(());
        };
        frame::run(Frame::handle(frame));
        frame.promise.rethrow()
    }

    /// Give up ownership. The frame owns itself until it is destroyed.
    #[must_use = "a released frame lives until it is destroyed"]
    pub fn release(mut self) -> Handle {
        let Some(frame) = self.frame.take() else {
            return Handle::empty();
        };
        Frame::detach(&frame);
        Frame::handle(&frame)
    }

    /// Move ownership out, leaving this owner empty.
    pub fn take(&mut self) -> Self {
        Self {
            frame: self.frame.take(),
        }
    }

    /// The promise state of the computation.
    pub fn promise(&self) -> Option<&Promise<K>> {
        self.frame.as_ref().map(|frame| &frame.promise)
    }

    /// Hand back a captured fault, if any.
    pub fn rethrow(&self) -> Result<(), Fault> {
        self.promise().map_or(Ok(()), Promise::rethrow)
    }

    /// Move the completion value out.
    pub fn take_result(&self) -> Option<K::Output> {
        self.promise().and_then(Promise::take_result)
    }

    pub(crate) fn frame(&self) -> Option<&Rc<Frame<K>>> {
        self.frame.as_ref()
    }
}

impl<K: Kind> Unique<K>
where
    K::Finish: Continuation,
{
    /// Install the computation to run when this one pauses or finishes.
    pub fn set_continuation(&self, continuation: Handle) {
        if let Some(promise) = self.promise() {
            promise.finish.set_continuation(continuation);
        }
    }
}

impl<K: Kind> fmt::Debug for Unique<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unique").field(&self.handle()).finish()
    }
}
