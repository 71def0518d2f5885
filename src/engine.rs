//! The public intake API: [`Engine`] (owns the worker thread) and
//! [`EngineHandle`] (the cheap, `Clone`-able, thread-safe object producers
//! actually call into).
//!
//! Mirrors the teacher's `PyLogger` method surface (`logger.rs`) but natively
//! typed instead of PyO3 `#[pymethods]`, and split into an owning handle vs.
//! a shared handle the way the teacher splits `backend::start_async_writer_if_needed`
//! (owns the worker thread) from the methods callers actually invoke.

use crate::backend::command::{Command, USER_GENERATION};
use crate::backend::processor::{self, ProcessorLoop};
use crate::backend::status::EngineStatus;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::model::LogRecord;
use crate::sink::{emit_retrying_once, Sink};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Owns the processor loop's worker thread. Dropping (or explicitly calling
/// [`Engine::shutdown`]) performs a final synchronous flush and joins the
/// thread, the same graceful-teardown shape as the teacher's
/// `backend::async::complete()`.
pub struct Engine {
    handle: EngineHandle,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl Engine {
    /// Construct and start the engine against the real system clock.
    pub fn new(config: EngineConfig, sink: Arc<dyn Sink>) -> Self {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    /// Construct and start the engine against a caller-supplied [`Clock`],
    /// for deterministic tests.
    pub fn with_clock(config: EngineConfig, sink: Arc<dyn Sink>, clock: Arc<dyn Clock>) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::bounded(100);
        let status = Arc::new(RwLock::new(EngineStatus::default()));

        let processor = ProcessorLoop::new(
            config,
            clock.clone(),
            sink.clone(),
            command_rx,
            command_tx.clone(),
            status.clone(),
        );
        let worker = processor::spawn(processor);

        let handle = EngineHandle {
            command_tx,
            sequence: Arc::new(AtomicU64::new(0)),
            clock,
            direct_sink: sink,
            status,
            channel_full_fallbacks: Arc::new(AtomicU64::new(0)),
        };

        Self { handle, worker: Some(worker) }
    }

    /// A cheap `Clone`-able handle producers can hold independently of this
    /// owning `Engine`.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Final sync flush, then stop and join the worker thread. Idempotent:
    /// calling twice (or calling then dropping) is a no-op the second time.
    pub fn shutdown(&mut self) {
        self.handle.shutdown();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::ops::Deref for Engine {
    type Target = EngineHandle;

    fn deref(&self) -> &EngineHandle {
        &self.handle
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The thread-safe, `Clone`-able producer-facing half of the engine. Every
/// method here is non-blocking except [`EngineHandle::sync_flush`] and
/// [`EngineHandle::shutdown`], per spec §4.1.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: crossbeam_channel::Sender<Command>,
    sequence: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
    /// The safety-valve path for a full command channel: the same `Sink` the
    /// processor loop emits through, called directly from the producer's own
    /// thread. This never touches engine state, so it does not violate the
    /// single-writer invariant.
    direct_sink: Arc<dyn Sink>,
    status: Arc<RwLock<EngineStatus>>,
    /// The one metric the processor loop can never observe directly: a
    /// channel-full fallback happens entirely on the producer's thread.
    /// Tracked here as its own atomic rather than forced through the
    /// single-writer state, and overlaid onto the processor's snapshot in
    /// `get_status`.
    channel_full_fallbacks: Arc<AtomicU64>,
}

impl EngineHandle {
    /// Stamp-critical path: sequence and timestamp are assigned here, at
    /// intake, under the atomic counter and the `Clock` — never deferred to
    /// the processor loop, so concurrent producers get ordering consistent
    /// with the order in which they called this method.
    pub fn add_log(&self, payload: Value, direct: bool) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let unix_ms = self.clock.now_ms();
        let record = LogRecord::new(payload, sequence, unix_ms, direct);
        match self.command_tx.try_send(Command::AddLog(record)) {
            Ok(()) => {}
            Err(crossbeam_channel::TrySendError::Full(Command::AddLog(record))) => {
                // Safety valve: the channel is saturated, so emit directly
                // rather than silently drop. Logs are never lost to a full
                // channel, only (rarely, and observably) to a full buffer.
                let payload = record.stamped_payload();
                emit_retrying_once("log.entry", || self.direct_sink.emit_log(&payload));
                let total = self.channel_full_fallbacks.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(sequence = record.sequence, total, "command channel full; emitted log directly");
            }
            Err(crossbeam_channel::TrySendError::Full(_)) | Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                // Engine shut down: drop with no effect, per spec §7.
            }
        }
    }

    /// Last-write-wins update for `task_id`. No sequence is assigned.
    pub fn update_progress(&self, task_id: impl Into<String>, fields: Map<String, Value>, direct: bool) {
        let task_id = task_id.into();
        let cmd = Command::UpdateProgress { task_id, fields, direct };
        if let Err(crossbeam_channel::TrySendError::Full(Command::UpdateProgress { task_id, fields, .. })) =
            self.command_tx.try_send(cmd)
        {
            let mut obj = fields;
            obj.insert("id".to_string(), Value::String(task_id));
            let payload = Value::Object(obj);
            emit_retrying_once("progress.updated", || self.direct_sink.emit_progress(&payload));
            let total = self.channel_full_fallbacks.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(total, "command channel full; emitted progress update directly");
        }
    }

    /// Enqueue a set of updates in one command to reduce channel churn.
    pub fn bulk_update_progress(&self, updates: Vec<(String, Map<String, Value>)>) {
        if let Err(crossbeam_channel::TrySendError::Full(Command::BulkUpdateProgress(updates))) =
            self.command_tx.try_send(Command::BulkUpdateProgress(updates))
        {
            let count = updates.len();
            for (task_id, mut fields) in updates {
                fields.insert("id".to_string(), Value::String(task_id));
                let payload = Value::Object(fields);
                emit_retrying_once("progress.updated", || self.direct_sink.emit_progress(&payload));
            }
            let total = self.channel_full_fallbacks.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(count, total, "command channel full; emitted bulk progress update directly");
        }
    }

    /// Schedule emission; returns immediately.
    pub fn flush(&self) {
        let _ = self.command_tx.send(Command::Flush);
    }

    /// Block until a flush covering every currently-buffered event has
    /// completed. Used before crash-report generation. No timeout: callers
    /// that need one wrap this call with their own deadline.
    pub fn sync_flush(&self) {
        let (completion, waiter) = crate::backend::command::completion_pair();
        if self.command_tx.send(Command::SyncFlush(completion)).is_ok() {
            waiter.wait();
        }
        // Disconnected: the engine has already shut down and flushed
        // everything it ever will; there is nothing left to wait for.
    }

    /// Toggle direct-pass vs. buffered operation.
    pub fn set_enabled(&self, enabled: bool) {
        let _ = self.command_tx.send(Command::SetEnabled(enabled));
    }

    /// Activate or deactivate the high-load override. A duration arms (or,
    /// on a subsequent call while already armed, resets) an expiry timer.
    pub fn set_high_load_mode(&self, enabled: bool, duration: Option<Duration>) {
        let _ = self.command_tx.send(Command::SetHighLoadMode {
            enabled,
            duration,
            generation: USER_GENERATION,
        });
    }

    /// Final sync flush, then stop the processor loop. Safe to call more
    /// than once or concurrently with [`Engine::drop`]; later calls observe
    /// a disconnected channel and return immediately.
    pub fn shutdown(&self) {
        let (completion, waiter) = crate::backend::command::completion_pair();
        if self.command_tx.send(Command::Shutdown(completion)).is_ok() {
            waiter.wait();
        }
    }

    /// A snapshot of `{rate, current_interval, buffer sizes, enabled,
    /// high_load_mode, log_sequence, ...}`. Exact for every field the
    /// processor loop itself tracks; `channel_full_fallbacks` is overlaid
    /// from this handle's own atomic since that event never reaches the
    /// loop.
    pub fn get_status(&self) -> EngineStatus {
        let mut status = *self.status.read();
        status.channel_full_fallbacks = self.channel_full_fallbacks.load(Ordering::Relaxed);
        status
    }
}
