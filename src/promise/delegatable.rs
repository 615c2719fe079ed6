//! The continuation slot.

use std::cell::RefCell;

use super::policy::{Continuation, FinishPolicy};
use crate::handle::Handle;

/// Owns the continuation of a computation.
///
/// With `PAUSE_AT_FINISH` the slot defaults to the no-op marker, so a finished
/// frame pauses and hands control back to whoever resumed it. Without it the
/// slot defaults to empty, and a frame finishing with nothing installed is
/// torn down instead of pausing.
#[derive(Debug)]
pub struct Delegatable<const PAUSE_AT_FINISH: bool> {
    continuation: RefCell<Handle>,
}

impl<const PAUSE_AT_FINISH: bool> Delegatable<PAUSE_AT_FINISH> {
    fn default_continuation() -> Handle {
        if PAUSE_AT_FINISH {
            Handle::noop()
        } else {
            Handle::empty()
        }
    }

    /// The currently installed continuation.
    pub fn continuation(&self) -> Handle {
        self.continuation.borrow().clone()
    }
}

impl<const PAUSE_AT_FINISH: bool> Default for Delegatable<PAUSE_AT_FINISH> {
    fn default() -> Self {
        Self {
            continuation: RefCell::new(Self::default_continuation()),
        }
    }
}

impl<const PAUSE_AT_FINISH: bool> FinishPolicy for Delegatable<PAUSE_AT_FINISH> {
    fn final_suspend(&self) -> Option<Handle> {
        let continuation = self.continuation();
        (!continuation.is_empty()).then_some(continuation)
    }

    fn intermediate_suspend(&self) -> Handle {
        if PAUSE_AT_FINISH || !self.continuation.borrow().is_empty() {
            self.continuation.replace(Self::default_continuation())
        } else {
            Handle::noop()
        }
    }
}

impl<const PAUSE_AT_FINISH: bool> Continuation for Delegatable<PAUSE_AT_FINISH> {
    fn set_continuation(&self, continuation: Handle) {
        self.continuation.replace(continuation);
    }
}
