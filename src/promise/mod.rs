//! Promise state and the capabilities it is composed from.
//!
//! Every frame carries a [`Promise`]: one field per capability, with the field
//! types picked by the frame's [`Kind`]. Kinds never implement behaviour
//! themselves; they only select which policy fills each slot.
//!
//! | Capability   | Associated type      | Options                                   |
//! |--------------|----------------------|-------------------------------------------|
//! | initiation   | [`Kind::Initiation`] | [`Eager`], [`Lazy`]                       |
//! | faults       | [`Kind::Faults`]     | [`Nothrow`], [`CaptureAndRethrow`]        |
//! | finish       | [`Kind::Finish`]     | [`PauseOnFinish`], [`DestroyOnFinish`], [`Delegatable`] |
//! | result       | [`Kind::Output`]     | any `'static` type, `()` for none         |
//! | yield        | [`Kind::Yield`]      | [`NoYield`], [`Yield`], [`DelegatingYield`] |

use std::cell::RefCell;

mod delegatable;
mod policy;
mod yields;

pub use delegatable::*;
pub use policy::*;
pub use yields::*;

/// A selection of capabilities describing one kind of computation.
///
/// ```rust
/// use relay::promise::*;
///
/// // A lazy task that pauses at every yield to hand control onward.
/// struct Relay;
///
/// impl Kind for Relay {
///     type Initiation = Lazy;
///     type Faults = CaptureAndRethrow;
///     type Finish = Delegatable<true>;
///     type Output = ();
///     type Yield = Yield<u32, true>;
/// }
/// ```
pub trait Kind: Sized + 'static {
    type Initiation: Initiation;
    type Faults: FaultPolicy;
    type Finish: FinishPolicy;
    /// Value the body completes with.
    type Output: 'static;
    type Yield: YieldPolicy;
}

/// Type of the values a kind yields.
pub type Item<K> = <<K as Kind>::Yield as Yields>::Item;

/// A single-value slot.
#[derive(Debug)]
pub struct Captured<T> {
    value: RefCell<Option<T>>,
}

impl<T> Default for Captured<T> {
    fn default() -> Self {
        Self {
            value: RefCell::new(None),
        }
    }
}

impl<T> Captured<T> {
    pub fn capture(&self, value: T) {
        self.value.replace(Some(value));
    }

    pub fn release(&self) -> Option<T> {
        self.value.take()
    }

    pub fn is_captured(&self) -> bool {
        self.value.borrow().is_some()
    }
}

/// Per-frame control block.
pub struct Promise<K: Kind> {
    pub(crate) faults: <K::Faults as FaultPolicy>::Slot,
    pub(crate) finish: K::Finish,
    pub(crate) result: Captured<K::Output>,
    pub(crate) yielded: K::Yield,
}

impl<K: Kind> Default for Promise<K> {
    fn default() -> Self {
        Self {
            faults: Default::default(),
            finish: K::Finish::default(),
            result: Captured::default(),
            yielded: K::Yield::default(),
        }
    }
}

impl<K: Kind> Promise<K> {
    /// The finish policy, which owns the continuation slot where there is one.
    pub fn finish(&self) -> &K::Finish {
        &self.finish
    }

    /// The yield capability.
    pub fn yielded(&self) -> &K::Yield {
        &self.yielded
    }

    /// Hand back a captured fault, if the fault policy keeps one.
    pub fn rethrow(&self) -> Result<(), crate::Fault> {
        K::Faults::rethrow(&self.faults)
    }

    /// Move the completion value out.
    pub fn take_result(&self) -> Option<K::Output> {
        self.result.release()
    }

    /// Whether a completion value is waiting to be taken.
    pub fn has_result(&self) -> bool {
        self.result.is_captured()
    }
}
