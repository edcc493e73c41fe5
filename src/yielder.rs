//! The per-coroutine capability object handed to stage bodies.
//!
//! A [`Yielder`] is the only way a body can interact with the outside world:
//! `recv` suspends until the next input value arrives, `emit` hands one
//! value downstream and suspends until control returns. It is never exposed
//! outside the body and becomes invalid once the body returns.
//!
//! Rather than patching emit behavior onto individual instances, a `Yielder`
//! is a pair of strategies fixed at construction: combinators and wiring
//! build derived yielders by substituting one strategy and passing the other
//! through unchanged.

use std::convert::Infallible;

use crate::error::StageResult;

/// Capability object passed into a coroutine body.
///
/// `I` is the type the body receives with [`recv`](Yielder::recv); `O` is
/// the type it hands downstream with [`emit`](Yielder::emit).
pub struct Yielder<'a, I, O> {
    recv_fn: &'a mut (dyn FnMut() -> StageResult<I> + 'a),
    emit_fn: &'a mut (dyn FnMut(O) -> StageResult<()> + 'a),
}

/// Yielder for pure sink bodies: `emit` is statically uncallable because no
/// value of [`Infallible`] can be produced.
pub type SinkYielder<'a, I> = Yielder<'a, I, Infallible>;

impl<'a, I, O> Yielder<'a, I, O> {
    pub(crate) fn from_parts(
        recv_fn: &'a mut (dyn FnMut() -> StageResult<I> + 'a),
        emit_fn: &'a mut (dyn FnMut(O) -> StageResult<()> + 'a),
    ) -> Self {
        Self { recv_fn, emit_fn }
    }

    /// Request the next input value, suspending until it is fed.
    ///
    /// Returns `Err(Cancel)` once the cancellation signal has been injected;
    /// after that the body is expected to terminate, normally by propagating
    /// the signal with `?`.
    pub fn recv(&mut self) -> StageResult<I> {
        (self.recv_fn)()
    }

    /// Hand one value downstream and suspend until control returns.
    pub fn emit(&mut self, value: O) -> StageResult<()> {
        (self.emit_fn)(value)
    }

    /// Borrow both strategies at once, so a derived yielder can substitute
    /// one while passing the other through.
    pub(crate) fn split(
        &mut self,
    ) -> (
        &mut (dyn FnMut() -> StageResult<I> + 'a),
        &mut (dyn FnMut(O) -> StageResult<()> + 'a),
    ) {
        (&mut *self.recv_fn, &mut *self.emit_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Cancel;

    #[test]
    fn test_recv_and_emit_use_strategies() {
        let mut inputs = vec![3, 2, 1];
        let mut outputs: Vec<i32> = Vec::new();

        let mut recv_fn = || inputs.pop().ok_or(Cancel);
        let mut emit_fn = |v: i32| {
            outputs.push(v);
            Ok(())
        };
        let mut y = Yielder::from_parts(&mut recv_fn, &mut emit_fn);

        while let Ok(v) = y.recv() {
            y.emit(v * 10).unwrap();
        }
        assert_eq!(outputs, vec![10, 20, 30]);
    }

    #[test]
    fn test_derived_yielder_substitutes_emit() {
        let mut inputs = vec![1];
        let mut outputs: Vec<String> = Vec::new();

        let mut recv_fn = || inputs.pop().ok_or(Cancel);
        let mut emit_fn = |v: String| {
            outputs.push(v);
            Ok(())
        };
        let mut outer: Yielder<i32, String> = Yielder::from_parts(&mut recv_fn, &mut emit_fn);

        // Derive a yielder that stringifies before passing through.
        {
            let (recv, emit) = outer.split();
            let mut stringify = |v: i32| emit(v.to_string());
            let mut inner: Yielder<i32, i32> = Yielder::from_parts(recv, &mut stringify);
            let v = inner.recv().unwrap();
            inner.emit(v + 1).unwrap();
        }
        assert_eq!(outputs, vec!["2".to_string()]);
    }
}
