//! Initiation, fault and finish policies.
//!
//! Each policy is a trait with a small set of implementors. A [`Kind`](super::Kind)
//! picks one implementor per policy; the frame consults the choice at its
//! start, at its completion, and whenever a fault escapes the body.

use std::cell::RefCell;

use crate::{error::Fault, handle::Handle};

/// When the body of a computation starts running.
pub trait Initiation: 'static {
    /// Start the body as soon as the computation is created.
    const EAGER: bool;
}

/// The body runs at creation, up to its first suspension.
pub enum Eager {}

/// The body runs on the first resume or await.
pub enum Lazy {}

impl Initiation for Eager {
    const EAGER: bool = true;
}

impl Initiation for Lazy {
    const EAGER: bool = false;
}

/// What happens to a fault that escapes the body.
pub trait FaultPolicy: 'static {
    /// Storage the policy keeps in the promise.
    type Slot: Default;

    fn capture(slot: &Self::Slot, fault: Fault);

    /// Hand back a captured fault, leaving the slot empty.
    fn rethrow(slot: &Self::Slot) -> Result<(), Fault>;
}

/// An escaping fault is fatal.
pub enum Nothrow {}

/// An escaping fault is stored and re-raised at the next observation.
pub enum CaptureAndRethrow {}

impl FaultPolicy for Nothrow {
    type Slot = ();

    fn capture(_slot: &(), fault: Fault) {
        tracing::error!(%fault, "fault escaped a nothrow computation, aborting");
        std::process::abort();
    }

    fn rethrow(_slot: &()) -> Result<(), Fault> {
        Ok(())
    }
}

impl FaultPolicy for CaptureAndRethrow {
    type Slot = RefCell<Option<Fault>>;

    fn capture(slot: &Self::Slot, fault: Fault) {
        tracing::debug!(%fault, "captured fault");
        slot.replace(Some(fault));
    }

    fn rethrow(slot: &Self::Slot) -> Result<(), Fault> {
        slot.take().map_or(Ok(()), Err)
    }
}

/// What happens when the body completes, and where a mid-body pause goes.
pub trait FinishPolicy: Default + 'static {
    /// Where control goes after completion.
    ///
    /// `None` means the frame does not pause at its end and is torn down.
    fn final_suspend(&self) -> Option<Handle>;

    /// Where control goes when the body pauses without finishing.
    fn intermediate_suspend(&self) -> Handle {
        Handle::noop()
    }
}

/// Finish policies that own a continuation slot.
pub trait Continuation: FinishPolicy {
    /// Install the computation to run when this one pauses or finishes.
    fn set_continuation(&self, continuation: Handle);
}

/// The frame stays alive at completion so its result can still be read.
#[derive(Debug, Default)]
pub struct PauseOnFinish;

/// The frame destroys itself at completion.
#[derive(Debug, Default)]
pub struct DestroyOnFinish;

impl FinishPolicy for PauseOnFinish {
    fn final_suspend(&self) -> Option<Handle> {
        Some(Handle::noop())
    }
}

impl FinishPolicy for DestroyOnFinish {
    fn final_suspend(&self) -> Option<Handle> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_rethrow_empties_slot() {
        let slot = <CaptureAndRethrow as FaultPolicy>::Slot::default();
        assert!(CaptureAndRethrow::rethrow(&slot).is_ok());

        CaptureAndRethrow::capture(&slot, Fault::new("first"));
        CaptureAndRethrow::capture(&slot, Fault::new("second"));
        assert_eq!(CaptureAndRethrow::rethrow(&slot).unwrap_err().message(), "second");
        assert!(CaptureAndRethrow::rethrow(&slot).is_ok());
    }

    #[test]
    fn test_finish_policies() {
        assert!(PauseOnFinish.final_suspend().is_some_and(|next| next.is_noop()));
        assert!(DestroyOnFinish.final_suspend().is_none());
        assert!(DestroyOnFinish.intermediate_suspend().is_noop());
    }

    #[test]
    fn test_initiation_flags() {
        assert!(Eager::EAGER);
        assert!(!Lazy::EAGER);
    }
}
