//! Error and control-signal types shared across the crate.
//!
//! Two very different things live here:
//!
//! - [`Cancel`], the cancellation signal. It is not a failure in the user
//!   sense: it is the expected mechanism for orderly shutdown, injected at a
//!   coroutine's suspension point and propagated with `?` out of stage
//!   bodies.
//! - [`PipeError`], genuine caller-facing errors such as feeding a stage
//!   that has already terminated.
//!
//! Wiring an object lacking the required capability is not represented here
//! at all: the [`Source`](crate::Source) and [`Sink`](crate::Sink) trait
//! bounds reject that at the point of connection, at compile time.

use thiserror::Error;

/// The cancellation signal.
///
/// Injected at a coroutine's pending `recv` or `emit` to request orderly
/// termination. A body that does not handle it terminates by propagating it
/// with `?`; a body that catches it to run cleanup must not resume normal
/// operation afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancellation requested")]
pub struct Cancel;

/// Result type used inside stage bodies, where the only error is [`Cancel`].
pub type StageResult<T> = Result<T, Cancel>;

/// Errors surfaced to the caller driving a pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipeError {
    /// A value was fed to a stage that has already terminated.
    #[error("sink exhausted: stage `{0}` has already terminated")]
    SinkExhausted(String),

    /// The stage's execution context vanished mid-feed (its body panicked).
    #[error("stage `{0}` disconnected before answering")]
    Disconnected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_display() {
        assert_eq!(Cancel.to_string(), "cancellation requested");
    }

    #[test]
    fn test_sink_exhausted_names_stage() {
        let err = PipeError::SinkExhausted("sum".to_string());
        assert!(err.to_string().contains("`sum`"));
        assert!(err.to_string().contains("sink exhausted"));
    }

    #[test]
    fn test_cancel_propagates_with_question_mark() {
        fn body() -> StageResult<i32> {
            Err(Cancel)?;
            Ok(1)
        }
        assert_eq!(body(), Err(Cancel));
    }
}
