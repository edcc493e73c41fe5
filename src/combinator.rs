//! Lazy combinators derived from a transformer.
//!
//! Each combinator builds a new body that runs the original body with a
//! substituted emit strategy: the combinator intercepts every value the
//! original would emit and decides what, if anything, reaches the true
//! downstream emit. Nothing is buffered except where the operation itself
//! demands it (`sort`, `collect`).
//!
//! Operations with no terminal state return a new [`Transformer`];
//! operations producing a single summary value return a [`Consumer`] whose
//! result is that summary, mirroring push wiring but with a transformed
//! emit rather than a literal forward.

use std::cmp::Ordering;

use crate::consumer::Consumer;
use crate::error::{Cancel, StageResult};
use crate::transformer::Transformer;
use crate::yielder::{SinkYielder, Yielder};

impl<I, O> Transformer<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Emit `f(v)` for every value the stage would emit.
    pub fn map<T, F>(self, mut f: F) -> Transformer<I, T>
    where
        T: Send + 'static,
        F: FnMut(O) -> T + Send + 'static,
    {
        let name = format!("{} | map", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, T>| {
            let (recv_fn, emit_fn) = y.split();
            let mut emit = move |value: O| emit_fn(f(value));
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Emit only the values for which `predicate` holds.
    pub fn filter<P>(self, mut predicate: P) -> Transformer<I, O>
    where
        P: FnMut(&O) -> bool + Send + 'static,
    {
        let name = format!("{} | filter", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, O>| {
            let (recv_fn, emit_fn) = y.split();
            let mut emit = move |value: O| {
                if predicate(&value) {
                    emit_fn(value)
                } else {
                    Ok(())
                }
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Emit only the values for which `predicate` fails.
    pub fn reject<P>(self, mut predicate: P) -> Transformer<I, O>
    where
        P: FnMut(&O) -> bool + Send + 'static,
    {
        let name = format!("{} | reject", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, O>| {
            let (recv_fn, emit_fn) = y.split();
            let mut emit = move |value: O| {
                if predicate(&value) {
                    Ok(())
                } else {
                    emit_fn(value)
                }
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Emit `f(v)` where `f` produces a value; drop the rest.
    pub fn filter_map<T, F>(self, mut f: F) -> Transformer<I, T>
    where
        T: Send + 'static,
        F: FnMut(O) -> Option<T> + Send + 'static,
    {
        let name = format!("{} | filter_map", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, T>| {
            let (recv_fn, emit_fn) = y.split();
            let mut emit = move |value: O| match f(value) {
                Some(mapped) => emit_fn(mapped),
                None => Ok(()),
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Emit each element of `f(v)`, in order.
    pub fn flat_map<T, It, F>(self, mut f: F) -> Transformer<I, T>
    where
        T: Send + 'static,
        It: IntoIterator<Item = T>,
        F: FnMut(O) -> It + Send + 'static,
    {
        let name = format!("{} | flat_map", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, T>| {
            let (recv_fn, emit_fn) = y.split();
            let mut emit = move |value: O| {
                for item in f(value) {
                    emit_fn(item)?;
                }
                Ok(())
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Emit the first `n` values, then raise the cancellation signal upward
    /// so the stage, and everything above it, stops.
    pub fn take(self, n: usize) -> Transformer<I, O> {
        let name = format!("{} | take({n})", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, O>| {
            let (recv_fn, emit_fn) = y.split();
            let mut taken = 0usize;
            let mut emit = move |value: O| -> StageResult<()> {
                if taken >= n {
                    return Err(Cancel);
                }
                emit_fn(value)?;
                taken += 1;
                if taken == n { Err(Cancel) } else { Ok(()) }
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Emit values while `predicate` holds, then raise the cancellation
    /// signal upward.
    pub fn take_while<P>(self, mut predicate: P) -> Transformer<I, O>
    where
        P: FnMut(&O) -> bool + Send + 'static,
    {
        let name = format!("{} | take_while", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, O>| {
            let (recv_fn, emit_fn) = y.split();
            let mut emit = move |value: O| {
                if predicate(&value) {
                    emit_fn(value)
                } else {
                    Err(Cancel)
                }
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Suppress the first `n` values, then pass everything through.
    pub fn skip(self, n: usize) -> Transformer<I, O> {
        let name = format!("{} | skip({n})", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, O>| {
            let (recv_fn, emit_fn) = y.split();
            let mut skipped = 0usize;
            let mut emit = move |value: O| {
                if skipped < n {
                    skipped += 1;
                    Ok(())
                } else {
                    emit_fn(value)
                }
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Suppress values while `predicate` holds, then pass everything
    /// through. The predicate sees values only, never propagated signals.
    pub fn skip_while<P>(self, mut predicate: P) -> Transformer<I, O>
    where
        P: FnMut(&O) -> bool + Send + 'static,
    {
        let name = format!("{} | skip_while", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, O>| {
            let (recv_fn, emit_fn) = y.split();
            let mut skipping = true;
            let mut emit = move |value: O| {
                if skipping && predicate(&value) {
                    return Ok(());
                }
                skipping = false;
                emit_fn(value)
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Side-effecting pass-through: call `f` on each value, then emit it.
    pub fn inspect<F>(self, mut f: F) -> Transformer<I, O>
    where
        F: FnMut(&O) + Send + 'static,
    {
        let name = format!("{} | inspect", self.name);
        let body = self.body;
        Transformer::named(name, move |y: &mut Yielder<I, O>| {
            let (recv_fn, emit_fn) = y.split();
            let mut emit = move |value: O| {
                f(&value);
                emit_fn(value)
            };
            let mut inner = Yielder::from_parts(recv_fn, &mut emit);
            body(&mut inner)
        })
    }

    /// Accumulate every emitted value into a single summary; never emits.
    /// The wrapping consumer's result is the final accumulated value.
    pub fn fold<Acc, F>(self, init: Acc, mut f: F) -> Consumer<I, Acc>
    where
        Acc: Send + 'static,
        F: FnMut(Acc, O) -> Acc + Send + 'static,
    {
        self.summarize(
            "fold",
            Some(init),
            move |slot, value| {
                if let Some(acc) = slot.take() {
                    *slot = Some(f(acc, value));
                }
                Ok(())
            },
            // The slot is only transiently empty while `f` runs.
            |slot| slot.ok_or(Cancel),
        )
    }

    /// Count the emitted values; the wrapping consumer's result is the
    /// total.
    pub fn count(self) -> Consumer<I, usize> {
        self.summarize(
            "count",
            0usize,
            |n, _| {
                *n += 1;
                Ok(())
            },
            Ok,
        )
    }

    /// Buffer every emitted value; the wrapping consumer's result is the
    /// collected sequence.
    pub fn collect(self) -> Consumer<I, Vec<O>> {
        self.summarize(
            "collect",
            Vec::new(),
            |buf, value| {
                buf.push(value);
                Ok(())
            },
            Ok,
        )
    }

    /// Buffer every emitted value; the wrapping consumer's result is the
    /// sorted sequence.
    pub fn sort(self) -> Consumer<I, Vec<O>>
    where
        O: Ord,
    {
        self.summarize(
            "sort",
            Vec::new(),
            |buf, value| {
                buf.push(value);
                Ok(())
            },
            |mut buf| {
                buf.sort();
                Ok(buf)
            },
        )
    }

    /// Like [`sort`](Transformer::sort), with a caller-supplied ordering.
    pub fn sort_by<F>(self, mut compare: F) -> Consumer<I, Vec<O>>
    where
        F: FnMut(&O, &O) -> Ordering + Send + 'static,
    {
        self.summarize(
            "sort_by",
            Vec::new(),
            |buf, value| {
                buf.push(value);
                Ok(())
            },
            move |mut buf| {
                buf.sort_by(|a, b| compare(a, b));
                Ok(buf)
            },
        )
    }

    /// Shared scaffolding for terminal combinators: run the body with an
    /// accumulating emit strategy, then produce the summary. Normal return
    /// and cancellation both yield the summary; cancellation is how a
    /// terminal stage is asked for it.
    fn summarize<R, State, StepF, FinishF>(
        self,
        label: &str,
        state: State,
        step: StepF,
        finish: FinishF,
    ) -> Consumer<I, R>
    where
        R: Send + 'static,
        State: Send + 'static,
        StepF: FnMut(&mut State, O) -> StageResult<()> + Send + 'static,
        FinishF: FnOnce(State) -> StageResult<R> + Send + 'static,
    {
        let name = format!("{} | {label}", self.name);
        let body = self.body;
        Consumer::named(name, move |y: &mut SinkYielder<I>| {
            let mut state = state;
            let mut step = step;
            let outcome = {
                let (recv_fn, _) = y.split();
                let mut accumulate = |value: O| step(&mut state, value);
                let mut inner = Yielder::from_parts(recv_fn, &mut accumulate);
                body(&mut inner)
            };
            let _ = outcome;
            finish(state)
        })
    }
}
