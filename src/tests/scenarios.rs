use crate::{Engine, EngineConfig, EngineConfigBuilder, EngineMode, RecordingSink, SinkEvent};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

fn builder() -> EngineConfigBuilder {
    EngineConfig::builder().direct_pass_threshold(None)
}

/// Spec §8 scenario 1 — burst absorption. Every submitted log is either
/// emitted or counted as dropped, emitted sequences never duplicate, and
/// the sequences that do survive stay in order across however many flushes
/// the buffer pressure forced.
#[test]
fn burst_absorption_accounts_for_every_submitted_log() {
    const TOTAL: u64 = 2_000;
    let config = builder()
        .max_buffer_size(200)
        .max_interval(Duration::from_millis(50))
        .min_interval(Duration::from_millis(5))
        .build()
        .unwrap();
    let sink = RecordingSink::new();
    let engine = Engine::new(config, sink.clone());

    for i in 0..TOTAL {
        engine.add_log(json!({"msg": format!("line {i}")}), false);
    }
    engine.sync_flush();

    let mut seen = Vec::new();
    for event in sink.events() {
        match event {
            // A batch preserves sequence order by construction (drained
            // from an ordered VecDeque); a direct emission (the channel-full
            // safety valve) is a single sequence with no batch to order
            // against.
            SinkEvent::LogBatch(batch) => {
                let mut last = None;
                for payload in batch {
                    let seq = payload["_sequence"].as_u64().unwrap();
                    if let Some(prev) = last {
                        assert!(seq > prev, "batch must be contiguous in sequence order");
                    }
                    last = Some(seq);
                    seen.push(seq);
                }
            }
            SinkEvent::Log(payload) => seen.push(payload["_sequence"].as_u64().unwrap()),
            _ => {}
        }
    }

    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "no sequence may be emitted twice");

    let status = engine.get_status();
    assert_eq!(
        seen.len() as u64 + status.dropped_logs,
        TOTAL,
        "every submitted log is either emitted or accounted as dropped"
    );
}

/// Spec §8 scenario 2 — progress collapse. Many updates for one id within a
/// short window collapse to a single emitted event carrying the latest value.
#[test]
fn progress_collapses_to_a_single_emission_of_the_latest_value() {
    let sink = RecordingSink::new();
    let engine = Engine::new(EngineConfig::default(), sink.clone());
    for i in 1..=1000 {
        let mut fields = serde_json::Map::new();
        fields.insert("progress".to_string(), json!(i));
        engine.update_progress("T1", fields, false);
    }
    engine.sync_flush();

    let progress_events: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SinkEvent::ProgressBatch(batch) => Some(batch),
            _ => None,
        })
        .collect();
    assert_eq!(progress_events.len(), 1, "exactly one progress batch should be emitted");
    let batch = &progress_events[0];
    assert_eq!(batch.len(), 1, "exactly one event for T1");
    assert_eq!(batch[0]["progress"], 1000);
}

/// Spec §8 scenario 4 — high-load timer extension. Re-arming before expiry
/// resets the deadline rather than stacking it: deactivation happens at the
/// latest arm time plus the duration, not the earliest.
#[test]
fn high_load_timer_extension_resets_rather_than_stacks() {
    let engine = Engine::new(EngineConfig::default(), RecordingSink::new());
    engine.set_high_load_mode(true, Some(Duration::from_millis(150)));
    std::thread::sleep(Duration::from_millis(75));
    engine.set_high_load_mode(true, Some(Duration::from_millis(150))); // resets to +150ms from here

    std::thread::sleep(Duration::from_millis(100));
    assert!(
        engine.get_status().high_load_mode,
        "must still be high-load at the original deadline (125ms), since it was extended"
    );

    std::thread::sleep(Duration::from_millis(150));
    assert!(
        !engine.get_status().high_load_mode,
        "must have deactivated well past the extended deadline (225ms)"
    );
}

/// Spec §8 scenario 5 — SyncFlush before crash-report generation.
#[test]
fn sync_flush_delivers_every_log_before_returning() {
    let config = builder().build().unwrap();
    let sink = RecordingSink::new();
    let engine = Engine::new(config, sink.clone());
    for i in 0..100 {
        engine.add_log(json!({"msg": i}), false);
    }
    engine.sync_flush();

    let total: usize = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SinkEvent::LogBatch(batch) => Some(batch.len()),
            _ => None,
        })
        .sum();
    assert_eq!(total, 100);
    assert_eq!(engine.get_status().log_buffer_len, 0);
}

/// Spec §8 scenario 6 — disabled bypass never collapses progress updates.
#[test]
fn disabled_engine_emits_every_update_without_collapsing() {
    let config = EngineConfig::builder().enabled(false).build().unwrap();
    let sink = RecordingSink::new();
    let engine = Engine::new(config, sink.clone());

    for i in 0..10u32 {
        engine.add_log(json!({"msg": i}), false);
    }
    for i in 0..10u32 {
        let mut fields = serde_json::Map::new();
        fields.insert("progress".to_string(), json!(i));
        engine.update_progress(format!("T{}", i % 5), fields, false);
    }

    let log_count = sink.events().iter().filter(|e| matches!(e, SinkEvent::Log(_))).count();
    let progress_count = sink.events().iter().filter(|e| matches!(e, SinkEvent::Progress(_))).count();
    assert_eq!(log_count, 10);
    assert_eq!(progress_count, 10);
    assert_eq!(engine.get_status().mode, EngineMode::Disabled);
}

/// Shutdown leaves no residual state and stops accepting further emissions.
#[test]
fn shutdown_flushes_and_terminates() {
    let config = builder().build().unwrap();
    let sink = RecordingSink::new();
    let mut engine = Engine::new(config, sink.clone());
    engine.add_log(json!({"msg": "before shutdown"}), false);
    engine.shutdown();

    let events_at_shutdown = sink.events().len();
    // Further calls on a shut-down engine must not panic and must not reach
    // the (now-stopped) processor loop.
    engine.add_log(json!({"msg": "after shutdown"}), false);
    engine.flush();
    assert_eq!(sink.events().len(), events_at_shutdown, "no new emissions after shutdown");
}
