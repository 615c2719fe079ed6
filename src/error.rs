//! Faults and errors.
//!
//! A [`Fault`] is a panic that escaped a computation body. Inside bodies faults
//! travel by unwinding; at the boundary to ordinary code they surface as
//! `Result<_, Fault>`.

use std::{any::Any, fmt, panic};

use thiserror::Error;

/// A fault captured from a computation body.
pub struct Fault {
    payload: Box<dyn Any + Send>,
}

impl Fault {
    /// Create a fault carrying a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            payload: Box::new(message.into()),
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self { payload }
    }

    /// The panic message, if the payload was a string.
    pub fn message(&self) -> &str {
        if let Some(message) = self.payload.downcast_ref::<&'static str>() {
            message
        } else if let Some(message) = self.payload.downcast_ref::<String>() {
            message
        } else {
            "opaque fault"
        }
    }

    /// Re-raise the fault in the current body.
    ///
    /// The unwinding is caught by whichever frame is running and captured
    /// according to that frame's fault policy.
    pub fn raise(self) -> ! {
        panic::resume_unwind(self.payload)
    }

    /// Recover the raw panic payload.
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fault").field(&self.message()).finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Fault {}

/// Errors reported by the iteration surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("computation faulted: {0}")]
    Fault(#[from] Fault),

    #[error("iterator advanced past the end of its generator")]
    PastEnd,

    #[error("iterator is already preempted")]
    AlreadyPreempted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_static_str_payload() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        let fault = Fault::from_panic(payload);
        assert_eq!(fault.message(), "boom");
        assert_eq!(fault.to_string(), "boom");
    }

    #[test]
    fn test_message_from_formatted_payload() {
        let payload = panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(Fault::from_panic(payload).message(), "code 7");
    }

    #[test]
    fn test_opaque_payload() {
        let fault = Fault::from_panic(Box::new(42_u8));
        assert_eq!(fault.message(), "opaque fault");
        assert_eq!(*fault.into_payload().downcast::<u8>().unwrap(), 42);
    }

    #[test]
    fn test_raise_round_trips_payload() {
        let caught = panic::catch_unwind(|| Fault::new("again").raise()).unwrap_err();
        assert_eq!(Fault::from_panic(caught).message(), "again");
    }

    #[test]
    fn test_error_wraps_fault() {
        let error: Error = Fault::new("inner").into();
        assert_eq!(error.to_string(), "computation faulted: inner");
    }
}
