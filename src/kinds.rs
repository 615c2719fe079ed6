//! The stock kinds of computation.
//!
//! | Kind                 | Initiation | Faults            | Finish              | Yield             |
//! |----------------------|------------|-------------------|---------------------|-------------------|
//! | [`Procedure`]        | eager      | nothrow           | destroy on finish   | none              |
//! | [`Task`]             | lazy       | capture, rethrow  | delegatable (pause) | none              |
//! | [`SimpleGenerator`]  | lazy       | capture, rethrow  | delegatable (pause) | plain             |
//! | [`Generator`]        | lazy       | capture, rethrow  | delegatable (pause) | delegating        |

use std::{future::Future, marker::PhantomData};

use crate::{
    context::Co,
    frame,
    handle::{Handle, Unique},
    promise::{
        CaptureAndRethrow, DelegatingYield, Delegatable, DestroyOnFinish, Eager, Kind, Lazy,
        NoYield, Nothrow, Yield,
    },
};

/// Fire-and-forget computation. Starts at once, owns itself, and is destroyed
/// when it finishes. A fault escaping its body aborts the process.
pub enum Procedure {}

impl Kind for Procedure {
    type Initiation = Eager;
    type Faults = Nothrow;
    type Finish = DestroyOnFinish;
    type Output = ();
    type Yield = NoYield;
}

impl Procedure {
    /// Start a procedure. It runs up to its first suspension before this
    /// returns.
    pub fn spawn<F>(body: F) -> Handle
    where
        F: Future<Output = ()> + 'static,
    {
        let handle = Unique::<Procedure>::build(|_| body).release();
        frame::run(handle.clone());
        handle
    }
}

/// The general chainable unit: lazy, captures faults, pauses at its end and
/// hands control to its continuation.
pub struct TaskKind<T>(PhantomData<fn() -> T>);

impl<T: 'static> Kind for TaskKind<T> {
    type Initiation = Lazy;
    type Faults = CaptureAndRethrow;
    type Finish = Delegatable<true>;
    type Output = T;
    type Yield = NoYield;
}

/// A task that produces values of type `Y` one at a time and completes with `R`.
pub struct SimpleGeneratorKind<Y, R>(PhantomData<fn() -> (Y, R)>);

impl<Y: 'static, R: 'static> Kind for SimpleGeneratorKind<Y, R> {
    type Initiation = Lazy;
    type Faults = CaptureAndRethrow;
    type Finish = Delegatable<true>;
    type Output = R;
    type Yield = Yield<Y>;
}

/// A simple generator that can also yield whole nested generators.
pub struct GeneratorKind<Y, R>(PhantomData<fn() -> (Y, R)>);

impl<Y: 'static, R: 'static> Kind for GeneratorKind<Y, R> {
    type Initiation = Lazy;
    type Faults = CaptureAndRethrow;
    type Finish = Delegatable<true>;
    type Output = R;
    type Yield = DelegatingYield<Y>;
}

pub type Task<T = ()> = Unique<TaskKind<T>>;
pub type SimpleGenerator<Y, R = ()> = Unique<SimpleGeneratorKind<Y, R>>;
pub type Generator<Y, R = ()> = Unique<GeneratorKind<Y, R>>;

impl<T: 'static> Unique<TaskKind<T>> {
    /// Create a task from its body. Nothing runs until it is resumed or
    /// awaited.
    pub fn new<F>(body: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        Self::from_fn(|_| body)
    }

    /// Create a task whose body receives its context.
    pub fn with_context<F, Fut>(make: F) -> Self
    where
        F: FnOnce(Co<TaskKind<T>>) -> Fut,
        Fut: Future<Output = T> + 'static,
    {
        Self::from_fn(make)
    }
}

impl<Y: 'static, R: 'static> Unique<SimpleGeneratorKind<Y, R>> {
    pub fn new<F, Fut>(make: F) -> Self
    where
        F: FnOnce(Co<SimpleGeneratorKind<Y, R>>) -> Fut,
        Fut: Future<Output = R> + 'static,
    {
        Self::from_fn(make)
    }
}

impl<Y: 'static, R: 'static> Unique<GeneratorKind<Y, R>> {
    pub fn new<F, Fut>(make: F) -> Self
    where
        F: FnOnce(Co<GeneratorKind<Y, R>>) -> Fut,
        Fut: Future<Output = R> + 'static,
    {
        Self::from_fn(make)
    }
}
