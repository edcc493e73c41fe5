//! The unit of pipeline composition: a coroutine that both requests input
//! and emits output.
//!
//! A transformer is inert until wired. Pull wiring attaches it downstream of
//! a sequence and yields a lazy iterator; push wiring attaches it upstream
//! of a sink and yields an eager [`Consumer`]; [`chain`](Transformer::chain)
//! fuses two transformers into one with no buffer in between.

use log::debug;

use crate::consumer::Consumer;
use crate::error::{Cancel, StageResult};
use crate::fiber::Fiber;
use crate::sink::Sink;
use crate::source::Source;
use crate::yielder::{SinkYielder, Yielder};

pub(crate) type TransformerBody<I, O> =
    Box<dyn FnOnce(&mut Yielder<I, O>) -> StageResult<()> + Send>;

/// A suspendable transforming stage: receives `I`, emits `O`.
///
/// Construction stores the body without running it; execution starts only
/// once a connection is established.
///
/// ```
/// use copipe::{Transformer, Yielder};
///
/// let running_sum = Transformer::new(|y: &mut Yielder<i32, i32>| {
///     let mut sum = 0;
///     loop {
///         sum += y.recv()?;
///         y.emit(sum)?;
///     }
/// });
/// let sums: Vec<i32> = running_sum.connect_to_source(1..=3).collect();
/// assert_eq!(sums, vec![1, 3, 6]);
/// ```
pub struct Transformer<I, O> {
    pub(crate) name: String,
    pub(crate) body: TransformerBody<I, O>,
}

impl<I, O> Transformer<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Store `body` for later execution. Nothing runs until the transformer
    /// is connected.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(&mut Yielder<I, O>) -> StageResult<()> + Send + 'static,
    {
        Self::named("stage", body)
    }

    /// Like [`new`](Transformer::new), with a name used in pipeline
    /// descriptions and logs.
    pub fn named<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&mut Yielder<I, O>) -> StageResult<()> + Send + 'static,
    {
        Transformer {
            name: name.into(),
            body: Box::new(body),
        }
    }

    /// Human-readable description of this stage, `" | "`-separated once
    /// stages have been chained.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pull wiring: attach this transformer downstream of `source`.
    ///
    /// Returns a lazy sequence. Each element request resumes the body, whose
    /// `recv` calls are satisfied by pulling `source`; each `emit` yields
    /// one element and suspends until the next request. On source
    /// exhaustion the cancellation signal is injected at the next `recv`;
    /// values the body still emits while unwinding are delivered, then the
    /// sequence ends.
    ///
    /// # Panics
    ///
    /// Panics if the stage thread cannot be spawned.
    pub fn connect_to_source<S>(self, source: S) -> PullStream<S, O>
    where
        S: Source<Item = I>,
    {
        debug!("pull-wiring `{}`", self.name);
        let fiber = Fiber::spawn(&self.name, self.body);
        PullStream {
            name: self.name,
            fiber,
            source,
            source_exhausted: false,
            done: false,
        }
    }

    /// Push wiring: attach this transformer upstream of `sink`.
    ///
    /// Returns a consumer wrapping the transformer; execution starts
    /// immediately. Every `emit` forwards its value to `sink.accept`. When
    /// the transformer terminates (normal return, or cancellation absorbed
    /// or propagated) the sink is closed and its close result becomes the
    /// wrapper's result.
    ///
    /// # Panics
    ///
    /// Panics if the stage thread cannot be spawned.
    pub fn connect_to_sink<S>(self, sink: S) -> Consumer<I, S::Closed>
    where
        S: Sink<Item = O> + Send + 'static,
        S::Closed: Send + 'static,
    {
        debug!("push-wiring `{}`", self.name);
        let name = format!("{} | sink", self.name);
        let body = self.body;
        Consumer::named(name, move |y: &mut SinkYielder<I>| {
            let mut sink = sink;
            let outcome = {
                let (recv_fn, _) = y.split();
                let mut forward = |value: O| -> StageResult<()> {
                    sink.accept(value);
                    Ok(())
                };
                let mut inner = Yielder::from_parts(recv_fn, &mut forward);
                body(&mut inner)
            };
            if outcome.is_err() {
                debug!("transformer cancelled, closing sink");
            }
            Ok(sink.close())
        })
    }

    /// Compose this transformer with a `downstream` one, without buffering.
    ///
    /// The upstream body runs in a nested context driven from within the
    /// downstream body's `recv`: while the nested context requests input it
    /// is answered from the composed stage's own upstream, cancellation
    /// included, so the upstream observes the same signal the downstream
    /// would; once it yields, that value answers the downstream `recv`.
    /// Once the nested context terminates, every further `recv` fails with
    /// the cancellation signal. Composition is associative.
    pub fn chain<T>(self, downstream: Transformer<O, T>) -> Transformer<I, T>
    where
        T: Send + 'static,
    {
        let name = format!("{} | {}", self.name, downstream.name);
        let upstream_name = self.name;
        let upstream_body = self.body;
        let downstream_body = downstream.body;
        Transformer::named(name, move |y: &mut Yielder<I, T>| {
            let (recv_fn, emit_fn) = y.split();
            let mut nested: Fiber<I, O, ()> = Fiber::spawn(&upstream_name, upstream_body);
            let mut pull_upstream = move || -> StageResult<O> { nested.pull_next(&mut *recv_fn) };
            let mut inner = Yielder::from_parts(&mut pull_upstream, emit_fn);
            downstream_body(&mut inner)
        })
    }
}

impl<T> Transformer<T, T>
where
    T: Send + 'static,
{
    /// The neutral pass-through stage.
    pub fn identity() -> Self {
        Transformer::named("identity", |y: &mut Yielder<T, T>| {
            loop {
                let value = y.recv()?;
                y.emit(value)?;
            }
        })
    }
}

/// Lazy sequence produced by pull wiring; see
/// [`connect_to_source`](Transformer::connect_to_source).
pub struct PullStream<S: Source, O> {
    name: String,
    fiber: Fiber<S::Item, O, ()>,
    source: S,
    source_exhausted: bool,
    done: bool,
}

impl<S: Source, O> PullStream<S, O> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S, O> Iterator for PullStream<S, O>
where
    S: Source,
    S::Item: Send + 'static,
    O: Send + 'static,
{
    type Item = O;

    fn next(&mut self) -> Option<O> {
        if self.done {
            return None;
        }
        let Self {
            name,
            fiber,
            source,
            source_exhausted,
            done,
        } = self;
        let mut supply = || -> StageResult<S::Item> {
            if *source_exhausted {
                return Err(Cancel);
            }
            match source.pull() {
                Some(value) => Ok(value),
                None => {
                    *source_exhausted = true;
                    Err(Cancel)
                }
            }
        };
        match fiber.pull_next(&mut supply) {
            Ok(value) => Some(value),
            Err(Cancel) => {
                debug!("pull stream `{name}` ended");
                *done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn running_sum() -> Transformer<i32, i32> {
        Transformer::named("sum", |y: &mut Yielder<i32, i32>| {
            let mut sum = 0;
            loop {
                sum += y.recv()?;
                y.emit(sum)?;
            }
        })
    }

    fn comma_append() -> Transformer<i32, String> {
        Transformer::named("comma", |y: &mut Yielder<i32, String>| {
            loop {
                let v = y.recv()?;
                y.emit(format!("{v},"))?;
            }
        })
    }

    #[test]
    fn test_pull_wiring_basic() {
        let sums: Vec<i32> = running_sum().connect_to_source(vec![1, 2, 3].into_iter()).collect();
        assert_eq!(sums, vec![1, 3, 6]);
    }

    #[test]
    fn test_push_wiring_basic() {
        let mut piped = running_sum().connect_to_sink(Vec::new());
        piped.feed(1).unwrap().feed(2).unwrap().feed(3).unwrap();
        assert_eq!(piped.close(), Some(&vec![1, 3, 6]));
    }

    #[test]
    fn test_push_pull_duality() {
        let pulled: Vec<i32> = running_sum().connect_to_source(1..=3).collect();

        let mut pushed = running_sum().connect_to_sink(Vec::new());
        pushed.feed_all(1..=3).unwrap();
        let pushed = pushed.into_result();

        assert_eq!(pulled, vec![1, 3, 6]);
        assert_eq!(pushed, Some(pulled));
    }

    #[test]
    fn test_chain_associativity() {
        let groupings: Vec<Transformer<i32, String>> = vec![
            running_sum()
                .chain(comma_append())
                .chain(Transformer::identity()),
            running_sum()
                .chain(comma_append().chain(Transformer::identity())),
            running_sum().chain(comma_append()),
        ];
        for stage in groupings {
            let mut piped = stage.connect_to_sink(String::new());
            piped.feed(1).unwrap().feed(2).unwrap().feed(3).unwrap();
            assert_eq!(piped.close(), Some(&"1,3,6,".to_string()));
        }
    }

    #[test]
    fn test_chain_pull_equals_flattened_push() {
        let chained: Vec<String> = running_sum()
            .chain(comma_append())
            .connect_to_source(1..=3)
            .collect();
        assert_eq!(chained, vec!["1,", "3,", "6,"]);
    }

    #[test]
    fn test_chain_names_compose() {
        let stage = running_sum().chain(comma_append());
        assert_eq!(stage.name(), "sum | comma");
    }

    #[test]
    fn test_lazy_until_connected() {
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let stage: Transformer<i32, i32> =
            Transformer::new(move |y: &mut Yielder<i32, i32>| {
                let _ = started_tx.send(());
                loop {
                    let value = y.recv()?;
                    y.emit(value)?;
                }
            });
        assert!(started_rx.try_recv().is_err());

        let mut stream = stage.connect_to_source(1..=1);
        assert_eq!(stream.next(), Some(1));
        assert_eq!(started_rx.try_recv(), Ok(()));
    }

    #[test]
    fn test_source_exhaustion_cancels_body() {
        // A stage that emits a summary while unwinding from cancellation.
        let counting: Transformer<i32, usize> =
            Transformer::named("count", |y: &mut Yielder<i32, usize>| {
                let mut n = 0;
                loop {
                    match y.recv() {
                        Ok(_) => n += 1,
                        Err(Cancel) => {
                            y.emit(n)?;
                            return Err(Cancel);
                        }
                    }
                }
            });
        let counts: Vec<usize> = counting.connect_to_source(0..5).collect();
        assert_eq!(counts, vec![5]);
    }

    #[test]
    fn test_early_consumer_stop_halts_upstream_pulls() {
        let pulls = Rc::new(Cell::new(0usize));
        let counter = pulls.clone();
        let unbounded = (1..).inspect(move |_| counter.set(counter.get() + 1));

        let mut stream = Transformer::<i32, i32>::identity().connect_to_source(unbounded);
        let first: Vec<i32> = stream.by_ref().take(3).collect();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(pulls.get(), 3);
    }

    #[test]
    fn test_pull_wiring_over_file_lines() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alpha\nbeta\ngamma").unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines = text.lines().map(|line| line.to_string());

        let upper: Vec<String> = Transformer::<String, String>::identity()
            .map(|line: String| line.to_uppercase())
            .connect_to_source(lines)
            .collect();
        assert_eq!(upper, vec!["ALPHA", "BETA", "GAMMA"]);
    }

    #[test]
    fn test_push_wiring_closes_sink_on_natural_return() {
        let first_two: Transformer<i32, i32> =
            Transformer::named("first-two", |y: &mut Yielder<i32, i32>| {
                for _ in 0..2 {
                    let v = y.recv()?;
                    y.emit(v)?;
                }
                Ok(())
            });
        let handle = crate::SharedSink::new(Vec::new());
        let mut piped = first_two.connect_to_sink(handle.clone());
        piped.feed(10).unwrap().feed(20).unwrap();

        assert!(piped.is_terminated());
        assert_eq!(handle.close_count(), 1);
        assert_eq!(handle.take_result(), Some(vec![10, 20]));
        // Closing again must not re-close the wrapped sink.
        piped.close();
        assert_eq!(handle.close_count(), 1);
    }
}
