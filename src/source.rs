//! The capability contract for values that produce a sequence.
//!
//! Anything iterable is a source: the blanket impl adapts every standard
//! iterator, so built-in containers gain the capability through their
//! iterators instead of being reopened.

use crate::error::StageResult;

/// A value producing a sequence of elements.
///
/// Offers both iteration styles the engine wires against: `pull` hands out
/// one element on demand (used to drive pull-wired transformers), and
/// [`push_into`](Source::push_into) visits every element in order, letting
/// the visitor abort early by raising the cancellation signal.
pub trait Source {
    type Item;

    /// Produce the next element, or `None` on exhaustion.
    fn pull(&mut self) -> Option<Self::Item>;

    /// Visit each remaining element in order. The visitor aborts the walk
    /// by returning `Err(Cancel)`, which is passed back to the caller.
    fn push_into<F>(&mut self, mut visit: F) -> StageResult<()>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> StageResult<()>,
    {
        while let Some(value) = self.pull() {
            visit(value)?;
        }
        Ok(())
    }
}

impl<T: Iterator> Source for T {
    type Item = T::Item;

    fn pull(&mut self) -> Option<T::Item> {
        self.next()
    }
}
