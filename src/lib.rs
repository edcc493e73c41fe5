//! # copipe
//!
//! A coroutine-based stream-composition engine.
//!
//! Pipeline stages are written as plain suspendable bodies: a body calls
//! [`recv`](Yielder::recv) to request its next input and
//! [`emit`](Yielder::emit) to hand a value downstream, suspending at each
//! call until its driver resumes it. Exactly one side runs at a time, so a
//! stage reads like straight-line code even though values flow through it
//! one at a time.
//!
//! ## Overview
//!
//! - [`Transformer`]: a stage that receives and emits; inert until wired.
//! - [`Consumer`]: a pure sink stage; runs eagerly and produces a result.
//! - Pull wiring ([`Transformer::connect_to_source`]) turns a transformer
//!   plus a [`Source`] into a lazy sequence.
//! - Push wiring ([`Transformer::connect_to_sink`]) turns a transformer
//!   plus a [`Sink`] into a consumer.
//! - [`Transformer::chain`] fuses stages with no buffering in between, and
//!   the combinators (`map`, `filter`, `take`, `fold`, ...) derive new
//!   stages without running anything.
//! - Termination travels as a typed cancellation signal ([`Cancel`]) that
//!   bodies propagate with `?` or intercept for cleanup.
//!
//! ## Example
//!
//! ```
//! use copipe::{Transformer, Yielder};
//!
//! let running_sum = Transformer::named("sum", |y: &mut Yielder<i32, i32>| {
//!     let mut sum = 0;
//!     loop {
//!         sum += y.recv()?;
//!         y.emit(sum)?;
//!     }
//! });
//!
//! let even_sums: Vec<i32> = running_sum
//!     .filter(|sum| sum % 2 == 0)
//!     .connect_to_source(1..=4)
//!     .collect();
//!
//! assert_eq!(even_sums, vec![6, 10]);
//! ```

mod combinator;
pub mod consumer;
pub mod error;
mod fiber;
pub mod multicast;
pub mod sink;
pub mod source;
pub mod transformer;
pub mod yielder;

pub use consumer::Consumer;
pub use error::{Cancel, PipeError, StageResult};
pub use multicast::Multicast;
pub use sink::{SharedSink, Sink};
pub use source::Source;
pub use transformer::{PullStream, Transformer};
pub use yielder::{SinkYielder, Yielder};
