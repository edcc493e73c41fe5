//! Suspendable execution contexts backing consumers and transformers.
//!
//! Each started coroutine body runs on its own thread, synchronized with the
//! driving side through a pair of zero-capacity rendezvous channels. A send
//! on either channel blocks until the other side receives, so at most one of
//! the two sides ever runs: control transfers synchronously at each `recv`
//! and `emit`, exactly the cooperative single-control-flow model the engine
//! promises. The threads are plumbing, not parallelism.
//!
//! The wire protocol is the tagged two-state resume protocol the chain
//! algorithm needs: the body reports `Awaiting` or `Yielding(value)`, and
//! the driver answers with `Feed(value)`, `Ack`, or `Cancel`.
//!
//! Dropping a [`Fiber`] disconnects both channels; a body blocked at a
//! suspension point observes that as cancellation and unwinds on its own.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;
use std::thread::{self, JoinHandle};

use crate::error::{Cancel, StageResult};
use crate::yielder::Yielder;

/// Driver-to-body message: the answer to a pending suspension.
enum Resume<I> {
    /// Answers an `Awaiting` suspension with the next input value.
    Feed(I),
    /// Answers a `Yielding` suspension, returning control to the body.
    Ack,
    /// Injects the cancellation signal at either suspension.
    Cancel,
}

/// Body-to-driver message: why the body suspended, or that it finished.
enum Suspend<O, R> {
    Awaiting,
    Yielding(O),
    /// Body outcome: `Some` for a normal return, `None` when it propagated
    /// the cancellation signal.
    Finished(Option<R>),
}

/// One observed suspension of the fiber, from the driver's point of view.
pub(crate) enum Step<O, R> {
    Awaiting,
    Yielded(O),
    Finished(Option<R>),
    /// The body panicked: its endpoints vanished without a `Finished`.
    Crashed,
}

/// Driving handle for one suspended coroutine body.
pub(crate) struct Fiber<I, O, R> {
    name: String,
    resume_tx: Sender<Resume<I>>,
    suspend_rx: Receiver<Suspend<O, R>>,
    handle: Option<JoinHandle<()>>,
    mid_emit: bool,
    finished: bool,
    crashed: bool,
}

impl<I, O, R> Fiber<I, O, R>
where
    I: Send + 'static,
    O: Send + 'static,
    R: Send + 'static,
{
    /// Start `body` in its own context. The body runs up to its first
    /// suspension attempt and then blocks until the driver steps it.
    pub(crate) fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(&mut Yielder<I, O>) -> StageResult<R> + Send + 'static,
    {
        let (resume_tx, resume_rx) = bounded::<Resume<I>>(0);
        let (suspend_tx, suspend_rx) = bounded::<Suspend<O, R>>(0);

        let handle = thread::Builder::new()
            .name(format!("copipe-{name}"))
            .spawn(move || {
                let recv_tx = suspend_tx.clone();
                let recv_rx = resume_rx.clone();
                let mut recv_fn = move || -> StageResult<I> {
                    if recv_tx.send(Suspend::Awaiting).is_err() {
                        return Err(Cancel);
                    }
                    match recv_rx.recv() {
                        Ok(Resume::Feed(value)) => Ok(value),
                        // Cancel, a protocol violation, or a vanished driver
                        // all read as cancellation from inside the body.
                        _ => Err(Cancel),
                    }
                };
                let emit_tx = suspend_tx.clone();
                let mut emit_fn = move |value: O| -> StageResult<()> {
                    if emit_tx.send(Suspend::Yielding(value)).is_err() {
                        return Err(Cancel);
                    }
                    match resume_rx.recv() {
                        Ok(Resume::Ack) => Ok(()),
                        _ => Err(Cancel),
                    }
                };
                let mut yielder = Yielder::from_parts(&mut recv_fn, &mut emit_fn);
                let outcome = body(&mut yielder);
                // The driver may already be gone; nothing to report then.
                let _ = suspend_tx.send(Suspend::Finished(outcome.ok()));
            })
            .expect("failed to spawn stage thread");

        Fiber {
            name: name.to_string(),
            resume_tx,
            suspend_rx,
            handle: Some(handle),
            mid_emit: false,
            finished: false,
            crashed: false,
        }
    }

    /// Receive the fiber's next suspension notice.
    pub(crate) fn step(&mut self) -> Step<O, R> {
        match self.suspend_rx.recv() {
            Ok(Suspend::Awaiting) => Step::Awaiting,
            Ok(Suspend::Yielding(value)) => Step::Yielded(value),
            Ok(Suspend::Finished(result)) => {
                self.retire();
                Step::Finished(result)
            }
            Err(_) => {
                self.crashed = true;
                self.retire();
                Step::Crashed
            }
        }
    }

    /// Answer a pending await with a value.
    ///
    /// A send can only fail when the body's thread is gone without having
    /// reported `Finished`, so a failure here also marks the fiber crashed.
    pub(crate) fn feed(&mut self, value: I) -> StageResult<()> {
        if self.resume_tx.send(Resume::Feed(value)).is_err() {
            self.crashed = true;
            self.retire();
            return Err(Cancel);
        }
        Ok(())
    }

    /// Inject the cancellation signal at the pending suspension.
    pub(crate) fn cancel(&mut self) -> StageResult<()> {
        self.resume_tx.send(Resume::Cancel).map_err(|_| Cancel)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// Drive the fiber to its next yielded value.
    ///
    /// Every `Awaiting` suspension is answered from `supply`; if `supply`
    /// reports cancellation it is propagated into the fiber, so the nested
    /// body observes the same signal its driver did. A final value emitted
    /// while the body unwinds is still returned. Once the fiber finishes,
    /// this and every further drive attempt fails with `Cancel`.
    pub(crate) fn pull_next(
        &mut self,
        supply: &mut dyn FnMut() -> StageResult<I>,
    ) -> StageResult<O> {
        if self.finished {
            return Err(Cancel);
        }
        if self.mid_emit {
            self.mid_emit = false;
            if self.resume_tx.send(Resume::Ack).is_err() {
                self.retire();
                return Err(Cancel);
            }
        }
        loop {
            match self.step() {
                Step::Awaiting => {
                    let answer = match supply() {
                        Ok(value) => Resume::Feed(value),
                        Err(Cancel) => Resume::Cancel,
                    };
                    if self.resume_tx.send(answer).is_err() {
                        self.retire();
                        return Err(Cancel);
                    }
                }
                Step::Yielded(value) => {
                    self.mid_emit = true;
                    return Ok(value);
                }
                Step::Finished(_) | Step::Crashed => return Err(Cancel),
            }
        }
    }

    fn retire(&mut self) {
        self.finished = true;
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            debug!("stage thread `{}` panicked", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> Fiber<i32, i32, ()> {
        Fiber::spawn("double", |y: &mut Yielder<i32, i32>| {
            loop {
                let v = y.recv()?;
                y.emit(v * 2)?;
            }
        })
    }

    #[test]
    fn test_pull_next_drives_body() {
        let mut fiber = doubling();
        let mut inputs = vec![3, 2, 1];
        let mut supply = move || inputs.pop().ok_or(Cancel);

        assert_eq!(fiber.pull_next(&mut supply), Ok(2));
        assert_eq!(fiber.pull_next(&mut supply), Ok(4));
        assert_eq!(fiber.pull_next(&mut supply), Ok(6));
        assert_eq!(fiber.pull_next(&mut supply), Err(Cancel));
        assert!(fiber.is_finished());
        // Finished fibers reject every further drive attempt.
        assert_eq!(fiber.pull_next(&mut supply), Err(Cancel));
    }

    #[test]
    fn test_final_emit_while_unwinding_is_delivered() {
        let mut fiber: Fiber<i32, i32, ()> = Fiber::spawn("count", |y| {
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
        let mut inputs = vec![30, 20, 10];
        let mut supply = move || inputs.pop().ok_or(Cancel);

        assert_eq!(fiber.pull_next(&mut supply), Ok(3));
        assert_eq!(fiber.pull_next(&mut supply), Err(Cancel));
    }

    #[test]
    fn test_immediate_return_finishes() {
        let mut fiber: Fiber<i32, i32, i32> = Fiber::spawn("done", |_y| Ok(7));
        match fiber.step() {
            Step::Finished(result) => assert_eq!(result, Some(7)),
            _ => panic!("expected immediate termination"),
        }
        assert!(fiber.is_finished());
    }

    #[test]
    fn test_feed_and_step_protocol() {
        let mut fiber: Fiber<i32, i32, i32> = Fiber::spawn("once", |y| {
            let v = y.recv()?;
            Ok(v + 1)
        });
        match fiber.step() {
            Step::Awaiting => {}
            _ => panic!("expected await"),
        }
        fiber.feed(41).unwrap();
        match fiber.step() {
            Step::Finished(result) => assert_eq!(result, Some(42)),
            _ => panic!("expected termination"),
        }
    }

    #[test]
    fn test_body_panic_reads_as_crash() {
        let mut fiber: Fiber<i32, i32, i32> =
            Fiber::spawn("explode", |_y| -> StageResult<i32> { panic!("stage failure") });
        match fiber.step() {
            Step::Crashed => {}
            _ => panic!("expected crash"),
        }
        assert!(fiber.is_finished());
        assert!(fiber.is_crashed());
    }

    #[test]
    fn test_cancel_at_await_propagates() {
        let mut fiber: Fiber<i32, i32, i32> = Fiber::spawn("cancelled", |y| {
            let v = y.recv()?;
            Ok(v)
        });
        match fiber.step() {
            Step::Awaiting => {}
            _ => panic!("expected await"),
        }
        fiber.cancel().unwrap();
        match fiber.step() {
            Step::Finished(result) => assert_eq!(result, None),
            _ => panic!("expected cancelled termination"),
        }
    }
}
