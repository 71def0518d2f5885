//! The Processor Loop: the engine's single writer.
//!
//! Owns `LogBuffer`, `ProgressMap`, and every other piece of mutable engine
//! state exclusively. Everything else — producers, the `GetStatus` read
//! path, timer callbacks — reaches it only by sending a [`Command`] down the
//! channel or by reading the shared status snapshot this loop publishes
//! after each iteration.

use crate::backend::buffers::{AdmitOutcome, LogBuffer, ProgressMap};
use crate::backend::command::{Command, USER_GENERATION};
use crate::backend::flush;
use crate::backend::highload::arm_timer;
use crate::backend::rate::RateMeter;
use crate::backend::status::{EngineMode, EngineStatus};
use crate::backend::throttle::{compute_interval, should_direct_pass};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::model::ProgressRecord;
use crate::sink::{emit_retrying_once, Sink};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// Everything the processor loop needs to run, handed off by [`crate::Engine::new`]
/// to the worker thread.
pub struct ProcessorLoop {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn Sink>,
    command_rx: crossbeam_channel::Receiver<Command>,
    command_tx: crossbeam_channel::Sender<Command>,
    status: Arc<RwLock<EngineStatus>>,

    log_buffer: LogBuffer,
    progress_map: ProgressMap,

    enabled: bool,
    high_load_mode: bool,
    high_load_generation: u64,
    current_interval: std::time::Duration,
    last_emit_time: Instant,
    rate_meter: RateMeter,
    running: bool,
    shutting_down: bool,

    dropped_logs: u64,
    direct_emits: u64,
    batches_emitted: u64,
    log_sequence_hwm: u64,
    sink_failures: u64,
}

impl ProcessorLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn Sink>,
        command_rx: crossbeam_channel::Receiver<Command>,
        command_tx: crossbeam_channel::Sender<Command>,
        status: Arc<RwLock<EngineStatus>>,
    ) -> Self {
        let enabled = config.enabled;
        let current_interval = config.min_interval;
        let rate_meter = RateMeter::new(config.rate_window, clock.as_ref());
        let last_emit_time = clock.monotonic();
        Self {
            config,
            clock,
            sink,
            command_rx,
            command_tx,
            status,
            log_buffer: LogBuffer::new(),
            progress_map: ProgressMap::new(),
            enabled,
            high_load_mode: false,
            high_load_generation: USER_GENERATION + 1,
            current_interval,
            last_emit_time,
            rate_meter,
            running: true,
            shutting_down: false,
            dropped_logs: 0,
            direct_emits: 0,
            batches_emitted: 0,
            log_sequence_hwm: 0,
            sink_failures: 0,
        }
    }

    /// Run until a `Shutdown` command completes or the channel disconnects.
    /// The only exit points from this loop.
    ///
    /// Two tickers drive emission cadence, per spec §4.6:
    /// - `periodic_ticker` is the forced periodic flush — it guarantees a
    ///   maximum emission latency independent of whatever the adaptive
    ///   controller currently has `current_interval` set to.
    /// - `adaptive_ticker` is the poll granularity for the adaptive rule
    ///   itself ("called ... when now − last_emit_time ≥ current_interval").
    ///   It ticks at `min_interval`, the finest interval the controller could
    ///   ever compute, so a deadline is never missed by more than that floor.
    pub fn run(mut self) {
        self.publish_status();
        let periodic_ticker = crossbeam_channel::tick(self.config.periodic_flush_interval);
        let adaptive_ticker = crossbeam_channel::tick(self.config.min_interval.max(std::time::Duration::from_millis(1)));
        while self.running {
            crossbeam_channel::select! {
                recv(self.command_rx) -> msg => {
                    match msg {
                        Ok(cmd) => self.execute(cmd),
                        Err(_) => {
                            // All senders dropped: host-supplied cancellation.
                            self.shutting_down = true;
                            self.async_flush();
                            self.running = false;
                        }
                    }
                }
                recv(periodic_ticker) -> _ => {
                    self.on_periodic_tick();
                }
                recv(adaptive_ticker) -> _ => {
                    self.on_adaptive_tick();
                }
            }
            self.publish_status();
        }
    }

    /// Forced periodic flush (spec §4.6): fires every `periodic_flush_interval`
    /// regardless of `current_interval`, guaranteeing maximum latency even in
    /// quiet periods the adaptive controller would otherwise throttle harder.
    fn on_periodic_tick(&mut self) {
        self.rate_meter.maybe_roll_window(self.clock.as_ref());
        self.recompute_interval();
        if !self.log_buffer.is_empty() || !self.progress_map.is_empty() {
            self.async_flush();
        }
    }

    /// Adaptive flush (spec §4.6): flush once `now − last_emit_time ≥
    /// current_interval` and at least one buffer is non-empty. This is the
    /// throttle controller's actual effect on cadence — without it,
    /// `current_interval` would only ever gate the buffer-pressure and
    /// periodic-ticker paths, never the interval it computes.
    fn on_adaptive_tick(&mut self) {
        self.rate_meter.maybe_roll_window(self.clock.as_ref());
        self.recompute_interval();
        if self.log_buffer.is_empty() && self.progress_map.is_empty() {
            return;
        }
        let elapsed = self.clock.monotonic().duration_since(self.last_emit_time);
        if elapsed >= self.current_interval {
            self.async_flush();
        }
    }

    fn execute(&mut self, cmd: Command) {
        match cmd {
            Command::AddLog(record) => self.handle_add_log(record),
            Command::UpdateProgress { task_id, fields, direct } => {
                self.handle_update_progress(task_id, fields, direct)
            }
            Command::BulkUpdateProgress(updates) => {
                for (task_id, fields) in updates {
                    self.handle_update_progress(task_id, fields, false);
                }
            }
            Command::Flush => self.async_flush(),
            Command::SyncFlush(completion) => {
                self.async_flush();
                // Publish before signaling: the waiter must observe the
                // post-flush snapshot the instant it unblocks, not whatever
                // was last published before this command ran.
                self.publish_status();
                completion.signal();
            }
            Command::SetEnabled(enabled) => self.handle_set_enabled(enabled),
            Command::SetHighLoadMode { enabled, duration, generation } => {
                self.handle_set_high_load_mode(enabled, duration, generation)
            }
            Command::Shutdown(completion) => {
                self.shutting_down = true;
                self.async_flush();
                self.running = false;
                self.publish_status();
                completion.signal();
            }
        }
    }

    fn handle_add_log(&mut self, record: crate::model::LogRecord) {
        self.rate_meter.record_event(self.clock.as_ref());
        self.recompute_interval();
        self.log_sequence_hwm = self.log_sequence_hwm.max(record.sequence);

        if record.is_critical() {
            // Direct-only: a critical log never enters the buffer, so it
            // can never also appear in a later batch (spec's chosen
            // resolution to the duplicate-emission open question).
            self.emit_log_direct(&record);
            return;
        }
        if !self.enabled {
            self.emit_log_direct(&record);
            return;
        }
        if should_direct_pass(self.rate_meter.rate(), self.high_load_mode, &self.config) {
            self.emit_log_direct(&record);
            return;
        }

        let sequence = record.sequence;
        match self.log_buffer.admit(record, self.config.max_buffer_size) {
            AdmitOutcome::Appended => {}
            AdmitOutcome::Dropped => {
                self.dropped_logs += 1;
                tracing::warn!(sequence, total_dropped = self.dropped_logs, "log buffer full; dropping non-critical log");
            }
        }
        if self.log_buffer.len() >= self.config.flush_pressure_threshold() {
            self.async_flush();
        }
    }

    fn handle_update_progress(
        &mut self,
        task_id: String,
        fields: serde_json::Map<String, serde_json::Value>,
        direct: bool,
    ) {
        if !self.enabled || direct {
            let record = ProgressRecord::new(task_id, fields);
            let payload = record.payload();
            if !emit_retrying_once("progress.updated", || self.sink.emit_progress(&payload)) {
                self.sink_failures += 1;
            }
            self.direct_emits += 1;
            return;
        }
        self.progress_map.update(ProgressRecord::new(task_id, fields));
    }

    /// Direct-emit a single log with the spec §4.8/§7 retry-once policy,
    /// tracking delivery failure for `GetStatus`.
    fn emit_log_direct(&mut self, record: &crate::model::LogRecord) {
        let payload = record.stamped_payload();
        if !emit_retrying_once("log.entry", || self.sink.emit_log(&payload)) {
            self.sink_failures += 1;
        }
        self.direct_emits += 1;
    }

    fn handle_set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            // Running-* -> Disabled: buffers must be empty from here on.
            self.async_flush();
            self.high_load_mode = false;
            self.high_load_generation += 1;
        } else {
            // Disabled -> Running-Normal, never Running-HighLoad.
            self.recompute_interval();
        }
    }

    fn handle_set_high_load_mode(&mut self, enabled: bool, duration: Option<std::time::Duration>, generation: u64) {
        if enabled {
            self.high_load_generation += 1;
            self.high_load_mode = true;
            self.current_interval = self.config.max_interval;
            if let Some(duration) = duration {
                arm_timer(duration, self.high_load_generation, self.command_tx.clone());
            }
        } else {
            let stale = generation != USER_GENERATION && generation != self.high_load_generation;
            if stale {
                tracing::debug!(
                    generation,
                    current_generation = self.high_load_generation,
                    "ignoring stale high-load deactivation from an expired timer"
                );
                return;
            }
            self.high_load_generation += 1;
            self.high_load_mode = false;
            self.recompute_interval();
        }
    }

    fn recompute_interval(&mut self) {
        if self.high_load_mode {
            self.current_interval = self.config.max_interval;
        } else {
            self.current_interval = compute_interval(self.rate_meter.rate(), &self.config);
        }
    }

    fn async_flush(&mut self) {
        if self.log_buffer.is_empty() && self.progress_map.is_empty() {
            return;
        }
        let (logs, progress, failures) = flush::flush(&mut self.log_buffer, &mut self.progress_map, self.sink.as_ref());
        if logs > 0 || progress > 0 {
            self.batches_emitted += 1;
        }
        self.sink_failures += failures;
        self.last_emit_time = self.clock.monotonic();
    }

    fn publish_status(&self) {
        let status = EngineStatus {
            rate: self.rate_meter.rate(),
            current_interval: self.current_interval,
            log_buffer_len: self.log_buffer.len(),
            progress_map_len: self.progress_map.len(),
            enabled: self.enabled,
            high_load_mode: self.high_load_mode,
            mode: EngineMode::derive(self.running, self.shutting_down, self.enabled, self.high_load_mode),
            log_sequence: self.log_sequence_hwm,
            dropped_logs: self.dropped_logs,
            direct_emits: self.direct_emits,
            channel_full_fallbacks: 0, // overlaid by EngineHandle::get_status from its own atomic
            batches_emitted: self.batches_emitted,
            sink_failures: self.sink_failures,
        };
        *self.status.write() = status;
    }
}

/// Spawn the processor loop on its own thread, matching the teacher's
/// thread-per-concern idiom (`backend/async.rs::start_async_writer_if_needed`)
/// rather than an async runtime — this crate stays synchronous throughout.
pub fn spawn(processor: ProcessorLoop) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || processor.run())
}
