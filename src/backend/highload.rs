//! High-load mode: a timed override that pins the emission interval to
//! `max_interval`, armed and disarmed entirely through the command channel.
//!
//! The generation counter that disambiguates a stale timer from a fresh
//! activation lives on `EngineState` in the processor loop, since only that
//! loop ever reads or bumps it. A timer thread only ever carries the
//! generation value it captured at arm time; it never touches engine state.

use crate::backend::command::Command;
use std::thread;
use std::time::Duration;

/// Arm a deactivation timer for high-load mode. Spawns a detached thread that
/// sleeps for `duration`, then sends a `SetHighLoadMode { enabled: false, .. }`
/// command tagged with `generation`. The processor loop discards the command
/// if a later activation has already advanced past that generation.
pub fn arm_timer(duration: Duration, generation: u64, sender: crossbeam_channel::Sender<Command>) {
    tracing::debug!(generation, ?duration, "armed high-load deactivation timer");
    thread::spawn(move || {
        thread::sleep(duration);
        let _ = sender.send(Command::SetHighLoadMode { enabled: false, duration: None, generation });
    });
}
