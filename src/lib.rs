//! # throttle-engine
//!
//! An adaptive event throttling engine that sits between a high-volume
//! producer of log and progress events and a bandwidth-limited UI consumer.
//! It preserves every event for durable diagnostics while collapsing,
//! reordering, and rate-limiting the stream actually delivered to the UI, so
//! the UI thread is never saturated.
//!
//! ## Architecture
//!
//! - `engine`: the public intake API — [`Engine`] (owns the worker thread)
//!   and [`EngineHandle`] (the cheap, cloneable, thread-safe object producers
//!   call into).
//! - `backend`: the command-serialized single-writer core — buffers, rate
//!   meter, throttle controller, high-load timer, command channel, processor
//!   loop, flush engine.
//! - `sink`: the boundary abstraction the engine emits through.
//! - `clock`: the monotonic/epoch time source, swappable for deterministic
//!   tests.
//! - `config`: the validated, chainable [`EngineConfig`] builder.
//! - `model`: `LogRecord`/`ProgressRecord` and the criticality predicate.
//! - `levels`: log level parsing and severity ordering.
//! - `error`: construction/validation error types.
//!
//! ## Design
//!
//! All state-mutating operations are serialized through a single command
//! channel into one processor loop, the only writer to the engine's buffers
//! and state (the single-writer invariant). Producers never touch internal
//! state directly; they enqueue commands and, for control operations,
//! optionally block on a completion signal.

mod backend;
mod clock;
mod config;
mod diagnostics;
mod engine;
mod error;
mod levels;
mod model;
mod sink;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use diagnostics::init_default_subscriber;
pub use engine::{Engine, EngineHandle};
pub use error::{EngineError, Result};
pub use levels::Level;
pub use model::{LogRecord, ProgressRecord};
pub use sink::{ChannelSink, NullSink, RecordingSink, Sink, SinkError, SinkEvent};

pub use backend::status::{EngineMode, EngineStatus};

#[cfg(test)]
mod tests;
