//! Await primitives: the suspension vocabulary used inside bodies.
//!
//! | Primitive    | Ready when                       | Resumes with                 |
//! |--------------|----------------------------------|------------------------------|
//! | [`Delegate`] | the target already finished      | the target's result          |
//! | [`Handoff`]  | the target is empty              | nothing                      |
//! | [`Callback`] | the completion fired during registration | the completion's arguments |
//! | [`Fetch`]    | always                           | the wrapped value            |

mod callback;
mod delegate;
mod fetch;
mod handoff;

pub use callback::*;
pub use delegate::*;
pub use fetch::*;
pub use handoff::*;
