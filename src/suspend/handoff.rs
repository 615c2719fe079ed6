//! Unconditional transfer of control.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    frame::{self, Suspend},
    handle::{AsHandle, Handle},
};

/// Transfers control to another computation without waiting for it.
///
/// A non-destructive handoff leaves the current frame suspended and
/// resumable; the target may be owned by the handoff itself, in which case its
/// frame lives inside the caller's body. A destructive handoff tears the
/// current frame down before the target runs, so the target must live
/// elsewhere; it only accepts a non-owning [`Handle`].
///
/// An empty target makes the handoff a no-op; the no-op marker suspends and
/// returns control to whoever resumed the current frame.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Handoff<T = Handle> {
    target: T,
    destructive: bool,
    suspended: bool,
}

impl<T: AsHandle> Handoff<T> {
    pub fn to(target: T) -> Self {
        Self {
            target,
            destructive: false,
            suspended: false,
        }
    }
}

impl Handoff<Handle> {
    pub fn destructive(target: Handle) -> Self {
        Self {
            target,
            destructive: true,
            suspended: false,
        }
    }
}

impl<T: AsHandle + Unpin> Future for Handoff<T> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.suspended {
            return Poll::Ready(());
        }
        let target = self.target.as_handle();
        if target.is_empty() {
            return Poll::Ready(());
        }
        let suspend = if self.destructive {
            Suspend::Destroy(target)
        } else {
            Suspend::Transfer(target)
        };
        if !frame::request(suspend) {
            return Poll::Ready(());
        }
        self.suspended = true;
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Task;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_empty_target_does_not_suspend() {
        let task = Task::new(async {
            Handoff::to(Handle::empty()).await;
            1
        });
        task.resume().unwrap();
        assert_eq!(task.take_result(), Some(1));
    }

    #[test]
    fn test_noop_target_returns_to_resumer() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let task = Task::new({
            let trace = Rc::clone(&trace);
            async move {
                trace.borrow_mut().push(1);
                Handoff::to(Handle::noop()).await;
                trace.borrow_mut().push(2);
            }
        });
        task.resume().unwrap();
        assert_eq!(&*trace.borrow(), &[1]);
        task.resume().unwrap();
        assert_eq!(&*trace.borrow(), &[1, 2]);
    }

    #[test]
    fn test_owned_target_runs_but_is_not_awaited() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let task = Task::new({
            let trace = Rc::clone(&trace);
            async move {
                let target = Task::new({
                    let trace = Rc::clone(&trace);
                    async move { trace.borrow_mut().push(1) }
                });
                Handoff::to(target).await;
                trace.borrow_mut().push(2);
            }
        });
        task.resume().unwrap();
        assert_eq!(&*trace.borrow(), &[1]);
        assert!(!task.done());
    }
}
