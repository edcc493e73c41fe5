//! The capability contract for values that accept a sequence.

use std::sync::{Arc, Mutex, MutexGuard};

/// A value accepting a sequence of elements.
///
/// `accept` returns `&mut Self` so several values can be fed fluently;
/// `close` consumes the sink and produces its final result, conventionally
/// the sink itself for plain containers.
pub trait Sink {
    type Item;
    type Closed;

    /// Append one value, returning the sink for fluent chaining.
    fn accept(&mut self, value: Self::Item) -> &mut Self;

    /// Finish the sink, producing its close result.
    fn close(self) -> Self::Closed;
}

impl<T> Sink for Vec<T> {
    type Item = T;
    type Closed = Vec<T>;

    fn accept(&mut self, value: T) -> &mut Self {
        self.push(value);
        self
    }

    fn close(self) -> Vec<T> {
        self
    }
}

impl Sink for String {
    type Item = String;
    type Closed = String;

    fn accept(&mut self, value: String) -> &mut Self {
        self.push_str(&value);
        self
    }

    fn close(self) -> String {
        self
    }
}

struct SharedState<S: Sink> {
    open: Option<S>,
    result: Option<S::Closed>,
    close_count: usize,
}

/// Clonable handle to a sink.
///
/// Push wiring and [`Multicast`](crate::Multicast) take ownership of their
/// sinks; a `SharedSink` lets the caller keep a view on a sink that has been
/// moved into wiring, to inspect its close result afterwards. It also counts
/// close calls, which makes fan-out behavior observable.
pub struct SharedSink<S: Sink> {
    inner: Arc<Mutex<SharedState<S>>>,
}

impl<S: Sink> SharedSink<S> {
    pub fn new(sink: S) -> Self {
        SharedSink {
            inner: Arc::new(Mutex::new(SharedState {
                open: Some(sink),
                result: None,
                close_count: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedState<S>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// How many times `close` has been called through any handle.
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    pub fn is_closed(&self) -> bool {
        self.lock().open.is_none()
    }

    /// Take the underlying sink's close result, if it has closed.
    pub fn take_result(&self) -> Option<S::Closed> {
        self.lock().result.take()
    }
}

impl<S: Sink> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        SharedSink {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Sink> Sink for SharedSink<S> {
    type Item = S::Item;
    type Closed = ();

    fn accept(&mut self, value: S::Item) -> &mut Self {
        if let Some(sink) = self.lock().open.as_mut() {
            sink.accept(value);
        }
        self
    }

    fn close(self) {
        let mut state = self.lock();
        if let Some(sink) = state.open.take() {
            state.result = Some(sink.close());
        }
        state.close_count += 1;
    }
}
