//! Yield capture: plain and delegating.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use super::Captured;
use crate::iter::Cursor;

/// The yield capability of a kind.
pub trait YieldPolicy: Default + 'static {}

/// Capabilities that record produced values.
pub trait Yields: YieldPolicy {
    /// Type of the produced values.
    type Item: 'static;

    /// Whether a yield point hands control to the continuation instead of
    /// always returning to the resumer.
    const ASYNC: bool;

    fn capture(&self, value: Self::Item);

    /// Move the most recent value out.
    fn release(&self) -> Option<Self::Item>;

    /// Record the iterator cursor pulling from this frame.
    fn attach(&self, _cursor: &Rc<Cursor<Self::Item>>) {}

    /// The iterator cursor pulling from this frame, if any.
    fn attached(&self) -> Option<Rc<Cursor<Self::Item>>> {
        None
    }
}

/// No yield capability.
#[derive(Debug, Default)]
pub struct NoYield;

impl YieldPolicy for NoYield {}

/// Records one produced value per yield statement.
pub struct Yield<T, const ASYNC: bool = false> {
    value: Captured<T>,
}

impl<T, const ASYNC: bool> Default for Yield<T, ASYNC> {
    fn default() -> Self {
        Self {
            value: Captured::default(),
        }
    }
}

impl<T: 'static, const ASYNC: bool> YieldPolicy for Yield<T, ASYNC> {}

impl<T: 'static, const IS_ASYNC: bool> Yields for Yield<T, IS_ASYNC> {
    type Item = T;
    const ASYNC: bool = IS_ASYNC;

    fn capture(&self, value: T) {
        self.value.capture(value);
    }

    fn release(&self) -> Option<T> {
        self.value.release()
    }
}

/// A yield capability that also accepts nested generators.
///
/// Yielding a nested generator drives it through the delegate protocol. While
/// it runs, the iterator pulling from this frame is rebound to it, so its
/// values appear inline in the outer sequence.
pub struct DelegatingYield<T: 'static, const ASYNC: bool = false> {
    base: Yield<T, ASYNC>,
    cursor: RefCell<Option<Weak<Cursor<T>>>>,
}

impl<T: 'static, const ASYNC: bool> Default for DelegatingYield<T, ASYNC> {
    fn default() -> Self {
        Self {
            base: Yield::default(),
            cursor: RefCell::new(None),
        }
    }
}

impl<T: 'static, const ASYNC: bool> YieldPolicy for DelegatingYield<T, ASYNC> {}

impl<T: 'static, const IS_ASYNC: bool> Yields for DelegatingYield<T, IS_ASYNC> {
    type Item = T;
    const ASYNC: bool = IS_ASYNC;

    fn capture(&self, value: T) {
        self.base.capture(value);
    }

    fn release(&self) -> Option<T> {
        self.base.release()
    }

    fn attach(&self, cursor: &Rc<Cursor<T>>) {
        self.cursor.replace(Some(Rc::downgrade(cursor)));
    }

    fn attached(&self) -> Option<Rc<Cursor<T>>> {
        self.cursor.borrow().as_ref().and_then(Weak::upgrade)
    }
}
