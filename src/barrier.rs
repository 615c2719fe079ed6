//! Fan-in over many computations.

use std::{
    cell::{Cell, RefCell},
    future::{Future, IntoFuture},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use tracing::{debug, warn};

use crate::{
    error::Fault,
    frame::{self, Suspend},
    handle::{Handle, Unique},
    kinds::Procedure,
    promise::{Continuation, Kind},
    suspend::Handoff,
};

#[derive(Default)]
struct Shared {
    count: Cell<usize>,
    continuation: RefCell<Handle>,
    faults: RefCell<Vec<Fault>>,
}

/// Waits for a group of computations to finish.
///
/// Each [`wait`](Barrier::wait) hands a computation to a driver procedure
/// that runs it to completion. Awaiting the barrier suspends until every
/// registered computation has finished; the last one to finish hands control
/// to the awaiting frame.
///
/// ```rust
/// use relay::{Barrier, Task};
///
/// let task = Task::new(async {
///     let barrier = Barrier::new();
///     barrier.wait(Task::new(async { println!("first") }));
///     barrier.wait(Task::new(async { println!("second") }));
///     barrier.await;
/// });
/// task.resume().unwrap();
/// assert!(task.done());
/// ```
#[derive(Default)]
pub struct Barrier {
    shared: Rc<Shared>,
}

impl Barrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered computations that have not yet finished.
    pub fn outstanding(&self) -> usize {
        self.shared.count.get()
    }

    /// Register a computation and start running it.
    ///
    /// Empty or already finished computations are ignored.
    pub fn wait<K>(&self, computation: Unique<K>)
    where
        K: Kind,
        K::Finish: Continuation,
    {
        if computation.done() {
            return;
        }
        let shared = Rc::clone(&self.shared);
        shared.count.set(shared.count.get() + 1);
        debug!(outstanding = shared.count.get(), "barrier registered computation");

        Procedure::spawn(async move {
            if let Err(fault) = computation.join().await {
                debug!(%fault, "barrier computation faulted");
                shared.faults.borrow_mut().push(fault);
            }
            let remaining = shared.count.get() - 1;
            shared.count.set(remaining);
            debug!(outstanding = remaining, "barrier computation finished");

            let next = if remaining == 0 {
                shared.continuation.take()
            } else {
                Handle::empty()
            };
            drop(shared);
            Handoff::destructive(next).await;
        });
    }
}

/// Awaiter returned by awaiting a [`Barrier`].
///
/// Evaluates once every registered computation has finished. The first fault
/// captured from them is re-raised in the awaiting body.
#[must_use = "futures do nothing unless awaited"]
pub struct Released {
    shared: Rc<Shared>,
}

impl Future for Released {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.shared.count.get() > 0 {
            self.shared.continuation.replace(frame::current());
            frame::request(Suspend::Return);
            return Poll::Pending;
        }

        let mut faults = self.shared.faults.take().into_iter();
        let Some(first) = faults.next() else {
            return Poll::Ready(());
        };
        for fault in faults {
            warn!(%fault, "barrier computation fault dropped");
        }
        first.raise()
    }
}

impl IntoFuture for &Barrier {
    type Output = ();
    type IntoFuture = Released;

    fn into_future(self) -> Released {
        Released {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl IntoFuture for Barrier {
    type Output = ();
    type IntoFuture = Released;

    fn into_future(self) -> Released {
        Released {
            shared: self.shared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Task;

    fn broken(message: &'static str) {
        panic!("{message}")
    }

    fn paused(trace: &Rc<RefCell<Vec<i32>>>, id: i32) -> (Task, Handle) {
        let task = Task::with_context({
            let trace = Rc::clone(trace);
            move |co| async move {
                co.pause().await;
                trace.borrow_mut().push(id);
            }
        });
        let handle = task.handle();
        (task, handle)
    }

    #[test]
    fn test_empty_barrier_is_ready() {
        let task = Task::new(async {
            let barrier = Barrier::new();
            barrier.wait(Task::<()>::default());
            assert_eq!(barrier.outstanding(), 0);
            (&barrier).await;
            7
        });
        task.resume().unwrap();
        assert_eq!(task.take_result(), Some(7));
    }

    #[test]
    fn test_last_finisher_releases_awaiter() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let (first, first_handle) = paused(&trace, 1);
        let (second, second_handle) = paused(&trace, 2);
        let barrier = Rc::new(Barrier::new());

        let task = Task::new({
            let trace = Rc::clone(&trace);
            let barrier = Rc::clone(&barrier);
            async move {
                barrier.wait(first);
                barrier.wait(second);
                (&*barrier).await;
                trace.borrow_mut().push(0);
            }
        });

        task.resume().unwrap();
        assert_eq!(barrier.outstanding(), 2);
        assert!(trace.borrow().is_empty());

        second_handle.resume().unwrap();
        assert_eq!(barrier.outstanding(), 1);
        assert!(!task.done());

        first_handle.resume().unwrap();
        assert_eq!(&*trace.borrow(), &[2, 1, 0]);
        assert_eq!(barrier.outstanding(), 0);
        assert!(task.done());
    }

    #[test]
    fn test_child_fault_is_rethrown_in_awaiter() {
        let task = Task::new(async {
            let barrier = Barrier::new();
            barrier.wait(Task::new(async { broken("first") }));
            barrier.wait(Task::new(async { broken("second") }));
            barrier.await;
        });
        assert_eq!(task.resume().unwrap_err().message(), "first");
    }
}
