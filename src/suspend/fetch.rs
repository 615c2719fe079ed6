//! Wrapping a value that is already available.

use std::{
    future::{self, Future},
    pin::Pin,
    task::{Context, Poll},
};

/// An awaitable that never suspends and evaluates to the wrapped value.
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Fetch<T> {
    value: future::Ready<T>,
}

/// Wrap a value so it can be awaited.
pub fn fetch<T>(value: T) -> Fetch<T> {
    Fetch {
        value: future::ready(value),
    }
}

impl<T> Future for Fetch<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.value).poll(cx)
    }
}
