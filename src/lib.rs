//! # Relay: Cooperative Computation Composition
//!
//! Build pausable computations out of `async` bodies, chain them by handing
//! control from one to the next, join groups of them, and iterate over the
//! values generators produce. Everything runs on the calling thread: resuming a
//! computation runs it synchronously to its next suspension.
//!
//! ## Core Types
//!
//! - **[`Unique<K>`]**: The single owner of a computation of kind `K`
//! - **[`Handle`]**: A non-owning reference that can resume a computation
//! - **[`Kind`](promise::Kind)**: A selection of capabilities (initiation,
//!   fault handling, finish behaviour, result, yield) describing a computation
//!
//! ## Stock Kinds
//!
//! - [`Procedure`] - Starts at once, owns itself, destroyed when finished
//! - [`Task<T>`] - Lazy, captures faults, completes with `T`
//! - [`SimpleGenerator<Y, R>`] - A task that yields values of type `Y`
//! - [`Generator<Y, R>`] - A simple generator that can also yield nested generators
//!
//! ## Example
//!
//! ```
//! use relay::*;
//!
//! let squares: Generator<u64> = Generator::new(|co| async move {
//!     for n in 1..=3 {
//!         co.yield_(n * n).await;
//!     }
//! });
//!
//! let total = Task::new(async move {
//!     let doubled = Task::new(async { fetch(2u64).await });
//!     let factor = doubled.await;
//!     let sum: u64 = squares.into_iter().map(Result::unwrap).sum();
//!     sum * factor
//! });
//!
//! total.resume().unwrap();
//! assert_eq!(total.take_result(), Some(28));
//! ```
//!
//! ## Await Primitives
//!
//! - `task.await` - Run another computation and take its result ([`Delegate`])
//! - [`Unique::join`] - Like awaiting, but hands a fault back as a value
//! - [`Handoff::to`] / [`Handoff::destructive`] - Transfer control without waiting
//! - [`Callback::new`] - Suspend until a callback-style API fires its completion
//! - [`fetch(value)`](fetch) - Await a value that is already available
//! - [`Barrier`] - Wait for a group of computations to finish
//!
//! ## Faults
//!
//! A panic escaping a body is a [`Fault`]. Kinds that capture faults hand
//! them back from [`Unique::resume`], re-raise them in an awaiting body, and
//! surface them from the next iterator increment.

mod barrier;
mod context;
mod error;
mod frame;
mod handle;
mod iter;
mod kinds;
pub mod prelude;
pub mod promise;
mod suspend;

pub use barrier::*;
pub use context::*;
pub use error::*;
pub use handle::*;
pub use iter::*;
pub use kinds::*;
pub use suspend::*;
