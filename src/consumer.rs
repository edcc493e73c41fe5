//! The pure sink coroutine: requests input, produces a final result.

use log::debug;
use std::convert::Infallible;

use crate::error::{PipeError, StageResult};
use crate::fiber::{Fiber, Step};
use crate::source::Source;
use crate::yielder::SinkYielder;

/// A coroutine that only requests input, producing a result on termination.
///
/// The body runs eagerly: construction executes it up to its first
/// [`recv`](crate::Yielder::recv) (or its return, for a body that never
/// suspends). Values are pushed in with [`feed`](Consumer::feed);
/// [`close`](Consumer::close) injects the cancellation signal and reads the
/// result.
///
/// ```
/// use copipe::{Consumer, SinkYielder};
///
/// let mut total = Consumer::new(|y: &mut SinkYielder<i32>| {
///     let mut sum = 0;
///     while let Ok(v) = y.recv() {
///         sum += v;
///     }
///     Ok(sum)
/// });
/// total.feed(1).unwrap().feed(2).unwrap();
/// assert_eq!(total.close(), Some(&3));
/// ```
pub struct Consumer<I, R> {
    name: String,
    fiber: Fiber<I, Infallible, R>,
    result: Option<R>,
    terminated: bool,
}

impl<I, R> Consumer<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    /// Construct a consumer and run its body to the first suspension.
    ///
    /// # Panics
    ///
    /// Panics if the stage thread cannot be spawned.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(&mut SinkYielder<I>) -> StageResult<R> + Send + 'static,
    {
        Self::named("consumer", body)
    }

    /// Like [`new`](Consumer::new), with a name used in errors and logs.
    pub fn named<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&mut SinkYielder<I>) -> StageResult<R> + Send + 'static,
    {
        let name = name.into();
        let fiber = Fiber::spawn(&name, body);
        let mut consumer = Consumer {
            name,
            fiber,
            result: None,
            terminated: false,
        };
        consumer.pump();
        consumer
    }

    /// Resume the body with `value` as the result of its pending `recv`.
    ///
    /// Fails with the exhausted-sink error once the consumer has terminated
    /// normally, and with the disconnected error when the body panicked,
    /// whether mid-feed or earlier. Returns the consumer itself on success,
    /// so several values can be fed fluently.
    pub fn feed(&mut self, value: I) -> Result<&mut Self, PipeError> {
        if self.terminated {
            return Err(if self.fiber.is_crashed() {
                PipeError::Disconnected(self.name.clone())
            } else {
                PipeError::SinkExhausted(self.name.clone())
            });
        }
        if self.fiber.feed(value).is_err() {
            self.terminated = true;
            return Err(PipeError::Disconnected(self.name.clone()));
        }
        self.pump();
        if self.fiber.is_crashed() {
            return Err(PipeError::Disconnected(self.name.clone()));
        }
        Ok(self)
    }

    /// Feed every element of `source`, stopping as soon as this consumer
    /// terminates on its own.
    pub fn feed_all<S>(&mut self, mut source: S) -> Result<&mut Self, PipeError>
    where
        S: Source<Item = I>,
    {
        while !self.terminated {
            match source.pull() {
                Some(value) => {
                    self.feed(value)?;
                }
                None => break,
            }
        }
        Ok(self)
    }

    /// Terminate the consumer and read its result.
    ///
    /// Injects the cancellation signal at the pending `recv`; a body that
    /// returns a value while handling it terminates with that value as its
    /// result, one that propagates the signal terminates without a result.
    /// Idempotent: closing a terminated consumer just returns the result
    /// again. A body that keeps awaiting after the signal is rejected
    /// defensively by re-injecting it.
    pub fn close(&mut self) -> Option<&R> {
        while !self.terminated {
            debug!("closing consumer `{}`", self.name);
            if self.fiber.cancel().is_err() {
                self.terminated = true;
                break;
            }
            self.pump();
        }
        self.result.as_ref()
    }

    /// Close and take ownership of the result.
    pub fn into_result(mut self) -> Option<R> {
        self.close();
        self.result
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The result, once terminated.
    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the body to its next suspension or its return.
    fn pump(&mut self) {
        match self.fiber.step() {
            Step::Awaiting => {}
            Step::Yielded(value) => match value {},
            Step::Finished(result) => {
                debug!("consumer `{}` terminated", self.name);
                self.result = result;
                self.terminated = true;
            }
            Step::Crashed => {
                debug!("consumer `{}` body panicked", self.name);
                self.terminated = true;
            }
        }
    }
}

#[cfg(test)]
impl<I, R: std::fmt::Debug> std::fmt::Debug for Consumer<I, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("name", &self.name)
            .field("terminated", &self.terminated)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl<I, R: PartialEq> PartialEq for Consumer<I, R> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.terminated == other.terminated
            && self.result == other.result
    }
}
