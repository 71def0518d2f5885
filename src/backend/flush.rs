//! Drains the buffers into batches and drives the Sink.

use crate::backend::buffers::{LogBuffer, ProgressMap};
use crate::sink::{emit_retrying_once, Sink};
use smallvec::SmallVec;

/// Most periodic flushes land well under this many events per batch; above
/// it the `SmallVec` spills to the heap like a plain `Vec` would.
const TYPICAL_BATCH_SIZE: usize = 32;

type PayloadBatch = SmallVec<[serde_json::Value; TYPICAL_BATCH_SIZE]>;

/// Drain both buffers and emit non-empty batches through `sink`. Returns the
/// number of logs emitted, the number of progress updates emitted, and the
/// number of batches that were never delivered (a transient failure that
/// didn't recover on retry, or a persistent one) per spec §4.8/§7.
pub fn flush(log_buffer: &mut LogBuffer, progress_map: &mut ProgressMap, sink: &dyn Sink) -> (usize, usize, u64) {
    let mut failures = 0;

    let logs = log_buffer.drain_all();
    let log_count = logs.len();
    if !logs.is_empty() {
        let payloads: PayloadBatch = logs.iter().map(|r| r.stamped_payload()).collect();
        if !emit_retrying_once("log.batch", || sink.emit_log_batch(&payloads)) {
            failures += 1;
        }
    }

    let updates = progress_map.drain_all();
    let progress_count = updates.len();
    if !updates.is_empty() {
        let payloads: PayloadBatch = updates.iter().map(|r| r.payload()).collect();
        if !emit_retrying_once("progress.batch", || sink.emit_progress_batch(&payloads)) {
            failures += 1;
        }
    }

    (log_count, progress_count, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogRecord, ProgressRecord};
    use crate::sink::RecordingSink;
    use crate::sink::SinkEvent;
    use serde_json::json;

    #[test]
    fn empty_buffers_emit_nothing() {
        let mut logs = LogBuffer::new();
        let mut progress = ProgressMap::new();
        let sink = RecordingSink::new();
        let (l, p, failures) = flush(&mut logs, &mut progress, sink.as_ref());
        assert_eq!((l, p, failures), (0, 0, 0));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn drains_logs_in_sequence_order() {
        let mut logs = LogBuffer::new();
        for seq in 0..5 {
            logs.admit(LogRecord::new(json!({"msg": seq}), seq, 0, false), 100);
        }
        let mut progress = ProgressMap::new();
        let sink = RecordingSink::new();
        let (l, _, failures) = flush(&mut logs, &mut progress, sink.as_ref());
        assert_eq!(l, 5);
        assert_eq!(failures, 0);
        match &sink.events()[0] {
            SinkEvent::LogBatch(batch) => {
                let seqs: Vec<_> = batch.iter().map(|v| v["_sequence"].as_u64().unwrap()).collect();
                assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(logs.is_empty());
    }

    #[test]
    fn drains_progress_as_one_batch() {
        let mut logs = LogBuffer::new();
        let mut progress = ProgressMap::new();
        let mut fields = serde_json::Map::new();
        fields.insert("progress".to_string(), json!(50));
        progress.update(ProgressRecord::new("T1", fields));
        let sink = RecordingSink::new();
        let (_, p, _) = flush(&mut logs, &mut progress, sink.as_ref());
        assert_eq!(p, 1);
        assert!(progress.is_empty());
    }

    #[test]
    fn a_batch_that_fails_twice_is_counted_but_does_not_panic() {
        use crate::sink::FlakySink;
        let mut logs = LogBuffer::new();
        logs.admit(LogRecord::new(json!({"msg": "x"}), 0, 0, false), 100);
        let mut progress = ProgressMap::new();
        let sink = FlakySink::new(2);
        let (l, p, failures) = flush(&mut logs, &mut progress, sink.as_ref());
        assert_eq!((l, p, failures), (1, 0, 1));
        assert!(sink.events().is_empty());
    }
}
