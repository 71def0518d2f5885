//! `LogBuffer` and `ProgressMap`, and the buffer's eviction policy.
//!
//! Both stores are owned exclusively by the processor loop; nothing here is
//! `Send`-shared for mutation.

use crate::model::{LogRecord, ProgressRecord};
use ahash::AHashMap;
use std::collections::VecDeque;

/// Outcome of offering a new log to a full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Appended normally; buffer was below capacity.
    Appended,
    /// Buffer was full; the log was dropped. This is the only allowed
    /// silent drop.
    Dropped,
}

/// An ordered, append-only (per normal operation) store of accepted logs,
/// bounded by `max_buffer_size`.
#[derive(Default)]
pub struct LogBuffer {
    records: VecDeque<LogRecord>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Offer a new log for admission under the hard capacity
    /// `max_buffer_size`, which this buffer's length never exceeds.
    ///
    /// Below capacity: append. At capacity: drop silently — the only
    /// admission path that drops a log without a trace.
    ///
    /// This buffer never special-cases criticality itself: the caller
    /// (`processor.rs::handle_add_log`) intercepts every critical log and
    /// direct-emits it before `admit` is ever called, per the spec's
    /// direct-only resolution of the duplicate-emission question (see
    /// `LogRecord::is_critical`). So by the time a record reaches here it is
    /// already known non-critical, and the spec's truncate-oldest-fifth
    /// eviction (reserved for an important log arriving at a full buffer)
    /// never has a record to apply to — the only degenerate drop that can
    /// ever happen at capacity is the one below.
    pub fn admit(&mut self, record: LogRecord, max_buffer_size: usize) -> AdmitOutcome {
        if self.records.len() < max_buffer_size {
            self.records.push_back(record);
            AdmitOutcome::Appended
        } else {
            AdmitOutcome::Dropped
        }
    }

    /// Drain every record in sequence order.
    pub fn drain_all(&mut self) -> Vec<LogRecord> {
        self.records.drain(..).collect()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }
}

/// A mapping from `task_id` to the most recent `ProgressRecord` for that id.
/// Last-write-wins is the eviction policy: there is no size bound beyond the
/// number of distinct ids the producer submits.
#[derive(Default)]
pub struct ProgressMap {
    latest: AHashMap<String, ProgressRecord>,
}

impl ProgressMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Overwrite (or insert) the latest record for `task_id`.
    pub fn update(&mut self, record: ProgressRecord) {
        self.latest.insert(record.task_id.clone(), record);
    }

    /// Drain every id's latest record; order is unspecified.
    pub fn drain_all(&mut self) -> Vec<ProgressRecord> {
        self.latest.drain().map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log(seq: u64, direct: bool) -> LogRecord {
        LogRecord::new(json!({"msg": "x"}), seq, 0, direct)
    }

    #[test]
    fn admits_below_capacity() {
        let mut buf = LogBuffer::new();
        assert_eq!(buf.admit(log(1, false), 10), AdmitOutcome::Appended);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn drops_noncritical_when_full() {
        let mut buf = LogBuffer::new();
        for i in 0..10 {
            buf.admit(log(i, false), 10);
        }
        assert_eq!(buf.len(), 10);
        let outcome = buf.admit(log(99, false), 10);
        assert_eq!(outcome, AdmitOutcome::Dropped);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn drops_when_full_regardless_of_the_direct_flag() {
        // `admit` itself never receives a critical record in the real
        // pipeline (the processor intercepts those before calling it), but
        // it must still behave safely — drop, not panic or grow past
        // capacity — if ever called with one directly, as this unit test
        // does.
        let mut buf = LogBuffer::new();
        for i in 0..10 {
            buf.admit(log(i, false), 10);
        }
        let outcome = buf.admit(log(99, true), 10);
        assert_eq!(outcome, AdmitOutcome::Dropped);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn drain_preserves_sequence_order() {
        let mut buf = LogBuffer::new();
        for i in 0..5 {
            buf.admit(log(i, false), 10);
        }
        let drained = buf.drain_all();
        let sequences: Vec<u64> = drained.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn progress_map_is_last_write_wins() {
        let mut map = ProgressMap::new();
        for i in 1..=1000 {
            let mut fields = serde_json::Map::new();
            fields.insert("progress".to_string(), json!(i));
            map.update(ProgressRecord::new("T1", fields));
        }
        assert_eq!(map.len(), 1);
        let drained = map.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].fields["progress"], 1000);
    }
}
