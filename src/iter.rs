//! Pull-based iteration over generators.
//!
//! A [`YieldIterator`] owns a generator and resumes it one yield at a time.
//! Internally it keeps a shared [`Cursor`] naming the frame to resume next.
//! The cursor is rebound while a delegating generator runs a nested one, so the
//! consumer sees a single flattened sequence, and it can be temporarily spliced
//! onto an unrelated frame to run extra work ahead of the stream.
//!
//! # Examples
//!
//! ```rust
//! use relay::Generator;
//!
//! let numbers: Generator<u32, &str> = Generator::new(|co| async move {
//!     co.yield_(1).await;
//!     co.yield_(2).await;
//!     "done"
//! });
//!
//! let mut iter = numbers.into_iter();
//! let values: Vec<_> = iter.by_ref().map(Result::unwrap).collect();
//! assert_eq!(values, vec![1, 2]);
//! assert_eq!(iter.into_return(), Some("done"));
//! ```

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use tracing::{debug, warn};

use crate::{
    error::{Error, Fault},
    frame::{self, Frame, Outcome},
    handle::{Handle, Unique},
    kinds::Task,
    promise::{Continuation, Item, Kind, Yields},
    suspend::Handoff,
};

/// Type-erased access to the value a frame last yielded.
pub(crate) trait Getter<Y> {
    fn take_value(&self) -> Option<Y>;
}

impl<K, Y> Getter<Y> for Frame<K>
where
    K: Kind,
    K::Yield: Yields<Item = Y>,
{
    fn take_value(&self) -> Option<Y> {
        self.promise.yielded.release()
    }
}

/// Iteration state shared between an iterator and the frames it pulls from.
///
/// Opaque outside the crate.
pub struct Cursor<Y: 'static> {
    frame: RefCell<Handle>,
    getter: RefCell<Option<Weak<dyn Getter<Y>>>>,
    deferred: RefCell<Option<Fault>>,
    driver: RefCell<Option<Task>>,
}

impl<Y: 'static> Default for Cursor<Y> {
    fn default() -> Self {
        Self {
            frame: RefCell::new(Handle::empty()),
            getter: RefCell::new(None),
            deferred: RefCell::new(None),
            driver: RefCell::new(None),
        }
    }
}

impl<Y: 'static> Cursor<Y> {
    /// Point the cursor at `frame`: the next increment resumes it and its
    /// yields become the current values.
    pub(crate) fn bind<K>(this: &Rc<Self>, frame: &Rc<Frame<K>>)
    where
        K: Kind,
        K::Yield: Yields<Item = Y>,
    {
        let getter: Weak<Frame<K>> = Rc::downgrade(frame);
        let getter: Weak<dyn Getter<Y>> = getter;
        this.frame.replace(Frame::handle(frame));
        this.getter.replace(Some(getter));
        frame.promise.yielded.attach(this);
    }

    fn bound(&self) -> Handle {
        self.frame.borrow().clone()
    }

    fn current(&self) -> Option<Y> {
        let getter = self.getter.borrow().as_ref().and_then(Weak::upgrade)?;
        getter.take_value()
    }

    /// Resume `frame` on the next increment instead of the bound frame,
    /// returning the frame it replaced.
    fn splice(&self, frame: Handle) -> Handle {
        self.frame.replace(frame)
    }

    fn defer(&self, fault: Fault) {
        let mut deferred = self.deferred.borrow_mut();
        match &*deferred {
            Some(_) => warn!(%fault, "fault dropped, another is already pending"),
            None => *deferred = Some(fault),
        }
    }

    fn is_preempted(&self) -> bool {
        self.driver.borrow().is_some()
    }
}

/// External iterator over the values a generator yields.
///
/// Holds the generator, so its completion value stays reachable through
/// [`return_value`](Self::return_value) and [`into_return`](Self::into_return)
/// once the sequence is exhausted.
///
/// Both `YieldIterator` and `&mut YieldIterator` implement `Iterator`. Items
/// are `Result`s: a fault raised while producing the next value is handed out
/// in place of that value.
///
/// The iterator is not fused. When the generator parks on something only
/// another party can resume, such as a [`Callback`](crate::Callback) whose
/// completion has not fired yet, `next` returns `None` while
/// [`is_end`](Self::is_end) is still `false`. Once that party resumes the
/// generator, `next` picks up the values it yields.
pub struct YieldIterator<K: Kind>
where
    K::Yield: Yields,
{
    root: Unique<K>,
    cursor: Rc<Cursor<Item<K>>>,
    output: Option<K::Output>,
    pending: Option<Fault>,
    primed: bool,
}

impl<K: Kind> YieldIterator<K>
where
    K::Yield: Yields,
{
    /// Bind to `generator` and run it to its first yield.
    pub fn new(generator: Unique<K>) -> Result<Self, Fault> {
        let mut iter = Self::unprimed(generator);
        iter.primed = true;
        iter.step()?;
        Ok(iter)
    }

    fn unprimed(root: Unique<K>) -> Self {
        let cursor = Rc::new(Cursor::default());
        if let Some(frame) = root.frame() {
            Cursor::bind(&cursor, frame);
        }
        Self {
            root,
            cursor,
            output: None,
            pending: None,
            primed: false,
        }
    }

    /// Whether the bound frame has finished.
    pub fn is_end(&self) -> bool {
        self.cursor.bound().done()
    }

    /// Move out the most recently yielded value.
    pub fn current(&self) -> Option<Item<K>> {
        self.cursor.current()
    }

    /// Resume the bound frame to its next yield, then surface any fault that
    /// resumption produced.
    pub fn advance(&mut self) -> Result<(), Error> {
        if self.is_end() {
            return Err(Error::PastEnd);
        }
        self.primed = true;
        self.step().map(drop).map_err(Error::from)
    }

    fn step(&mut self) -> Result<Outcome, Fault> {
        let outcome = frame::run(self.cursor.bound());
        if let Some(fault) = self.cursor.deferred.take() {
            return Err(fault);
        }
        match self.cursor.bound().frame() {
            Some(frame) => frame.rethrow().map(|()| outcome),
            None => Ok(outcome),
        }
    }

    /// Run `preemptor` ahead of the rest of the stream.
    ///
    /// The next increment resumes the preemptor instead of the bound frame.
    /// Once it finishes it is destroyed and the preempted frame is resumed in
    /// the same increment, so nothing the preemptor yields is ever observed.
    /// A fault in the preemptor surfaces at that increment.
    pub fn preempt<P>(&mut self, preemptor: Unique<P>) -> Result<(), Error>
    where
        P: Kind,
        P::Finish: Continuation,
    {
        if self.is_end() {
            return Err(Error::PastEnd);
        }
        if self.cursor.is_preempted() {
            return Err(Error::AlreadyPreempted);
        }
        if preemptor.done() {
            if let Err(fault) = preemptor.rethrow() {
                self.cursor.defer(fault);
            }
            return Ok(());
        }

        let preempted = self.cursor.bound();
        let cursor = Rc::downgrade(&self.cursor);
        let driver = Task::with_context({
            let preempted = preempted.clone();
            move |co| async move {
                if let Some(cursor) = cursor.upgrade() {
                    cursor.splice(preemptor.handle());
                }
                preemptor.set_continuation(co.handle());
                Handoff::to(preemptor.handle()).await;
                // Reached early whenever the preemptor pauses.
                while !preemptor.done() {
                    preemptor.set_continuation(co.handle());
                    Handoff::to(Handle::noop()).await;
                }
                let fault = preemptor.rethrow().err();
                drop(preemptor);

                let Some(cursor) = cursor.upgrade() else {
                    return;
                };
                if let Some(fault) = fault {
                    cursor.defer(fault);
                }
                cursor.splice(preempted.clone());
                let this = cursor.driver.take();
                drop(cursor);
                drop(this);
                Handoff::destructive(preempted).await;
            }
        });

        debug!(preempted = ?preempted, driver = ?driver.handle(), "iterator preempted");
        self.cursor.splice(driver.handle());
        self.cursor.driver.replace(Some(driver));
        Ok(())
    }

    /// The generator's completion value, once the sequence is exhausted.
    pub fn return_value(&mut self) -> Option<&K::Output> {
        if self.output.is_none() && self.root.done() {
            self.output = self.root.take_result();
        }
        self.output.as_ref()
    }

    /// Consume the iterator and return the generator's completion value, if
    /// it has finished.
    pub fn into_return(mut self) -> Option<K::Output> {
        self.return_value();
        self.output
    }
}

impl<K: Kind> Iterator for YieldIterator<K>
where
    K::Yield: Yields,
{
    type Item = Result<Item<K>, Fault>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.primed {
            self.primed = true;
            if let Err(fault) = self.step() {
                return Some(Err(fault));
            }
        }
        if let Some(fault) = self.pending.take() {
            return Some(Err(fault));
        }
        // A resumption that produced nothing (a pause, or a preemptor's run)
        // moves on to the next one, unless the generator parked.
        while !self.is_end() {
            let value = self.current();
            let outcome = match self.step() {
                Ok(outcome) => outcome,
                Err(fault) => {
                    self.pending = Some(fault);
                    Outcome::Returned
                }
            };
            match value {
                Some(value) => return Some(Ok(value)),
                None => {
                    if let Some(fault) = self.pending.take() {
                        return Some(Err(fault));
                    }
                    if outcome == Outcome::Parked {
                        debug!(frame = ?self.cursor.bound(), "generator parked, iteration paused");
                        return None;
                    }
                }
            }
        }
        None
    }
}

/// A generator viewed as a sequence.
pub struct YieldRange<K: Kind> {
    generator: Unique<K>,
}

impl<K: Kind> YieldRange<K>
where
    K::Yield: Yields,
{
    pub fn new(generator: Unique<K>) -> Self {
        Self { generator }
    }

    /// An iterator positioned at the first yielded value.
    pub fn begin(self) -> Result<YieldIterator<K>, Fault> {
        YieldIterator::new(self.generator)
    }
}

impl<K: Kind> IntoIterator for YieldRange<K>
where
    K::Yield: Yields,
{
    type Item = Result<Item<K>, Fault>;
    type IntoIter = YieldIterator<K>;

    fn into_iter(self) -> YieldIterator<K> {
        YieldIterator::unprimed(self.generator)
    }
}

impl<K: Kind> IntoIterator for Unique<K>
where
    K::Yield: Yields,
{
    type Item = Result<Item<K>, Fault>;
    type IntoIter = YieldIterator<K>;

    fn into_iter(self) -> YieldIterator<K> {
        YieldIterator::unprimed(self)
    }
}
