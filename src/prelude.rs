//! Commonly used imports
//!
//! Use `use relay::prelude::*;` for quick access to the most common types and functions.

// Ownership and handles
pub use crate::{AsHandle, Handle, Unique};

// Stock kinds
pub use crate::{Generator, Procedure, SimpleGenerator, Task};

// Body context
pub use crate::Co;

// Await primitives
pub use crate::{fetch, Barrier, Callback, Completion, Handoff};

// Iteration
pub use crate::{YieldIterator, YieldRange};

// Faults
pub use crate::{Error, Fault};
