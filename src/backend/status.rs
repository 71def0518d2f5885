//! The snapshot returned by `GetStatus`, and the engine's operating-mode
//! state machine (spec §4.9).

use std::time::Duration;

/// One of the five states the engine can occupy. Derived from
/// `running`/`enabled`/`high_load_mode` rather than tracked independently,
/// so it can never drift out of sync with the fields that actually drive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    RunningNormal,
    RunningHighLoad,
    Disabled,
    ShuttingDown,
    Terminated,
}

impl EngineMode {
    /// Compute the current mode from the processor's authoritative fields.
    pub fn derive(running: bool, shutting_down: bool, enabled: bool, high_load_mode: bool) -> Self {
        if !running {
            EngineMode::Terminated
        } else if shutting_down {
            EngineMode::ShuttingDown
        } else if !enabled {
            EngineMode::Disabled
        } else if high_load_mode {
            EngineMode::RunningHighLoad
        } else {
            EngineMode::RunningNormal
        }
    }
}

/// A point-in-time snapshot of engine state, read through a shared cell the
/// processor loop updates after every command and tick — exact rather than
/// reconstructed from racing atomics, barring `channel_full_fallbacks` (see
/// `EngineHandle::get_status`, which overlays that one field from its own
/// atomic since that event never reaches the processor loop at all).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub rate: f64,
    pub current_interval: Duration,
    pub log_buffer_len: usize,
    pub progress_map_len: usize,
    pub enabled: bool,
    pub high_load_mode: bool,
    pub mode: EngineMode,
    pub log_sequence: u64,
    pub dropped_logs: u64,
    pub direct_emits: u64,
    pub channel_full_fallbacks: u64,
    pub batches_emitted: u64,
    /// Emissions that were never delivered after the §4.8/§7 retry-once
    /// policy gave up. Only covers Sink calls the Processor Loop itself
    /// makes; the channel-full safety valve's direct emission happens on the
    /// producer's thread and is not retried (same structural reason
    /// `channel_full_fallbacks` is overlaid rather than tracked here).
    pub sink_failures: u64,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            rate: 0.0,
            current_interval: Duration::ZERO,
            log_buffer_len: 0,
            progress_map_len: 0,
            enabled: true,
            high_load_mode: false,
            mode: EngineMode::RunningNormal,
            log_sequence: 0,
            dropped_logs: 0,
            direct_emits: 0,
            channel_full_fallbacks: 0,
            batches_emitted: 0,
            sink_failures: 0,
        }
    }
}
