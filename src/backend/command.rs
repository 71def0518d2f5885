//! The command channel's payload types and completion signaling.
//!
//! Every state mutation is expressed as one of these variants and sent down
//! a single channel into the processor loop — no other path ever reaches
//! the engine's buffers.

use crate::model::LogRecord;
use serde_json::Map;
use std::time::Duration;

/// Sentinel `generation` for a `SetHighLoadMode` command issued directly by a
/// caller rather than by an expiry timer. The processor loop always applies
/// these; only timer-originated commands carry a real generation that can be
/// stale.
pub const USER_GENERATION: u64 = 0;

/// One command accepted by the processor loop.
pub enum Command {
    /// Stamped at intake; sequence/timestamp already assigned.
    AddLog(LogRecord),
    /// Last-write-wins update for a single `task_id`.
    UpdateProgress { task_id: String, fields: Map<String, serde_json::Value>, direct: bool },
    /// A batch of updates enqueued in one command to reduce channel churn.
    BulkUpdateProgress(Vec<(String, Map<String, serde_json::Value>)>),
    /// Schedules emission; returns immediately.
    Flush,
    /// Schedules emission; the caller blocks on `Completion` until it runs.
    SyncFlush(Completion),
    SetEnabled(bool),
    /// `generation` disambiguates a stale deactivation racing a fresh
    /// activation: the processor loop only applies a deactivation whose
    /// generation matches the current one. [`USER_GENERATION`] is the
    /// sentinel used by direct API calls (as opposed to timer callbacks),
    /// which always apply immediately.
    SetHighLoadMode { enabled: bool, duration: Option<Duration>, generation: u64 },
    /// Terminal command: final sync flush, then the loop exits.
    Shutdown(Completion),
}

/// One-shot completion signal for `SyncFlush`/`Shutdown`.
pub struct Completion {
    tx: crossbeam_channel::Sender<()>,
}

impl Completion {
    /// Mark the operation complete. Idempotent in the sense that dropping an
    /// unsignaled `Completion` (e.g. the loop panics) simply unblocks the
    /// waiter's `recv` with a disconnect error, which `Waiter::wait` treats
    /// the same as a normal signal — callers never hang.
    pub fn signal(self) {
        let _ = self.tx.send(());
    }
}

/// The caller side of a [`Completion`].
pub struct Waiter {
    rx: crossbeam_channel::Receiver<()>,
}

impl Waiter {
    /// Block until the paired `Completion` is signaled or dropped.
    pub fn wait(self) {
        let _ = self.rx.recv();
    }
}

/// Build a fresh completion/waiter pair for one `SyncFlush`/`Shutdown`.
pub fn completion_pair() -> (Completion, Waiter) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (Completion { tx }, Waiter { rx })
}
