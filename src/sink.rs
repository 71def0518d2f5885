//! The Sink abstraction the engine emits through.
//!
//! Object-safe and `Send + Sync`: the engine holds an `Arc<dyn Sink>` and
//! never learns what transport is on the other side. Every method here is
//! synchronous and assumed non-blocking — the engine does not suspend on I/O.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};

/// The boundary abstraction through which the engine emits events to the UI
/// transport. Implementations must not block meaningfully; the processor
/// loop calls these directly from its own thread.
///
/// Emission is best-effort: a `Sink` may report a failure, but the engine
/// never awaits acknowledgment of success (spec §4.8). `Err` only exists so
/// [`emit_retrying_once`] has something to retry against; a `Sink` that can
/// never fail (like [`NullSink`]) simply always returns `Ok(())`.
pub trait Sink: Send + Sync {
    /// `log.batch`: ordered list of log payloads.
    fn emit_log_batch(&self, payloads: &[Value]) -> Result<(), SinkError>;
    /// `progress.batch`: list of progress payloads, at most one per `id`.
    fn emit_progress_batch(&self, updates: &[Value]) -> Result<(), SinkError>;
    /// `log.entry`: single log payload (direct-pass or critical).
    fn emit_log(&self, payload: &Value) -> Result<(), SinkError>;
    /// `progress.updated`: single progress payload (direct-pass).
    fn emit_progress(&self, payload: &Value) -> Result<(), SinkError>;
}

/// A failure reported by a [`Sink`] call. `transient` distinguishes a
/// worth-retrying hiccup (e.g. a full pipe) from a failure retrying won't
/// fix (e.g. the receiver has disconnected for good).
#[derive(Debug, Clone)]
pub struct SinkError {
    pub message: String,
    pub transient: bool,
}

impl SinkError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self { message: message.into(), transient: true }
    }

    pub fn persistent(message: impl Into<String>) -> Self {
        Self { message: message.into(), transient: false }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SinkError {}

/// Call `op` once; on a transient failure, retry exactly once (spec §4.8:
/// "the engine MAY retry the batch once"; §7: "Policy: one retry; if it
/// fails, proceed; do not block"). A persistent failure, or a transient one
/// that fails again on retry, is logged through `tracing` — the diagnostic
/// channel spec §7 distinguishes from the primary `Sink` being throttled —
/// and otherwise swallowed; the Processor Loop never blocks on Sink trouble.
///
/// Returns whether the event was ultimately delivered, so callers can track
/// it in `GetStatus`.
pub fn emit_retrying_once(label: &'static str, mut op: impl FnMut() -> Result<(), SinkError>) -> bool {
    match op() {
        Ok(()) => true,
        Err(e) if e.transient => {
            tracing::debug!(label, error = %e.message, "transient sink failure; retrying once");
            match op() {
                Ok(()) => true,
                Err(e2) => {
                    tracing::error!(label, error = %e2.message, "sink failure persisted after retry");
                    false
                }
            }
        }
        Err(e) => {
            tracing::error!(label, error = %e.message, "persistent sink failure");
            false
        }
    }
}

/// One event as seen by a [`ChannelSink`] consumer.
#[derive(Debug, Clone)]
pub enum SinkEvent {
    LogBatch(Vec<Value>),
    ProgressBatch(Vec<Value>),
    Log(Value),
    Progress(Value),
}

/// A `Sink` that forwards every call onto a channel, for host processes that
/// prefer to pull events on their own schedule (e.g. a single-threaded UI
/// polling between paint frames) and for tests/demos.
pub struct ChannelSink {
    sender: crossbeam_channel::Sender<SinkEvent>,
}

impl ChannelSink {
    /// Create a sink/receiver pair. The receiver end is unbounded: the
    /// engine's Sink contract is fire-and-forget, so backpressure here would
    /// just move the bottleneck without fixing it — it is the host's job to
    /// drain promptly.
    pub fn new() -> (Self, crossbeam_channel::Receiver<SinkEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl Sink for ChannelSink {
    fn emit_log_batch(&self, payloads: &[Value]) -> Result<(), SinkError> {
        self.sender
            .send(SinkEvent::LogBatch(payloads.to_vec()))
            .map_err(|_| SinkError::persistent("channel sink receiver disconnected"))
    }

    fn emit_progress_batch(&self, updates: &[Value]) -> Result<(), SinkError> {
        self.sender
            .send(SinkEvent::ProgressBatch(updates.to_vec()))
            .map_err(|_| SinkError::persistent("channel sink receiver disconnected"))
    }

    fn emit_log(&self, payload: &Value) -> Result<(), SinkError> {
        self.sender
            .send(SinkEvent::Log(payload.clone()))
            .map_err(|_| SinkError::persistent("channel sink receiver disconnected"))
    }

    fn emit_progress(&self, payload: &Value) -> Result<(), SinkError> {
        self.sender
            .send(SinkEvent::Progress(payload.clone()))
            .map_err(|_| SinkError::persistent("channel sink receiver disconnected"))
    }
}

/// A `Sink` that discards everything. Useful for benchmarking the engine's
/// own overhead in isolation from any transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn emit_log_batch(&self, _payloads: &[Value]) -> Result<(), SinkError> {
        Ok(())
    }
    fn emit_progress_batch(&self, _updates: &[Value]) -> Result<(), SinkError> {
        Ok(())
    }
    fn emit_log(&self, _payload: &Value) -> Result<(), SinkError> {
        Ok(())
    }
    fn emit_progress(&self, _payload: &Value) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A `Sink` that records every call in-memory, for assertions in tests that
/// need to inspect exactly what was emitted and in what order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Sink for RecordingSink {
    fn emit_log_batch(&self, payloads: &[Value]) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::LogBatch(payloads.to_vec()));
        Ok(())
    }

    fn emit_progress_batch(&self, updates: &[Value]) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::ProgressBatch(updates.to_vec()));
        Ok(())
    }

    fn emit_log(&self, payload: &Value) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::Log(payload.clone()));
        Ok(())
    }

    fn emit_progress(&self, payload: &Value) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::Progress(payload.clone()));
        Ok(())
    }
}

/// A `Sink` that fails its first `N` calls (transiently) before behaving like
/// a [`RecordingSink`], for exercising [`emit_retrying_once`]'s retry path
/// deterministically in tests.
#[cfg(test)]
pub(crate) struct FlakySink {
    remaining_failures: std::sync::atomic::AtomicUsize,
    inner: Arc<RecordingSink>,
}

#[cfg(test)]
impl FlakySink {
    pub(crate) fn new(fail_times: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining_failures: std::sync::atomic::AtomicUsize::new(fail_times),
            inner: RecordingSink::new(),
        })
    }

    pub(crate) fn events(&self) -> Vec<SinkEvent> {
        self.inner.events()
    }

    fn maybe_fail(&self) -> Result<(), SinkError> {
        use std::sync::atomic::Ordering;
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(SinkError::transient("flaky sink induced failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
impl Sink for FlakySink {
    fn emit_log_batch(&self, payloads: &[Value]) -> Result<(), SinkError> {
        self.maybe_fail()?;
        self.inner.emit_log_batch(payloads)
    }

    fn emit_progress_batch(&self, updates: &[Value]) -> Result<(), SinkError> {
        self.maybe_fail()?;
        self.inner.emit_progress_batch(updates)
    }

    fn emit_log(&self, payload: &Value) -> Result<(), SinkError> {
        self.maybe_fail()?;
        self.inner.emit_log(payload)
    }

    fn emit_progress(&self, payload: &Value) -> Result<(), SinkError> {
        self.maybe_fail()?;
        self.inner.emit_progress(payload)
    }
}
