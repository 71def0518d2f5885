//! Data model: `LogRecord`, `ProgressRecord`, and the criticality predicate.
//!
//! The payload is caller-supplied JSON of arbitrary shape; the engine injects
//! `_sequence`/`_unix_time`/`_original_time` at emission time without
//! otherwise touching it.

use crate::levels::Level;
use serde_json::Value;

/// Behaviors that are always critical regardless of level.
///
/// An allow-list rather than an open-ended string match, so a caller-supplied
/// `behavior` can only escalate criticality through names this crate knows
/// about.
const CRITICAL_BEHAVIORS: &[&str] = &["abort_task", "abort_all"];

/// An accepted log event, stamped at intake.
///
/// `payload` is preserved verbatim for emission. `level`/`behavior` are
/// advisory fields parsed best-effort from the payload for policy decisions
/// (criticality, nothing else) — a payload that fails to parse is simply
/// treated as non-critical.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub payload: Value,
    pub sequence: u64,
    pub unix_ms: i64,
    pub direct: bool,
    pub level: Option<Level>,
    pub behavior: Option<String>,
}

impl LogRecord {
    /// Build a record from a caller payload, parsing advisory fields
    /// best-effort. `direct` is a caller-supplied hint; it does not by
    /// itself change the payload's shape, only its criticality.
    pub fn new(payload: Value, sequence: u64, unix_ms: i64, direct: bool) -> Self {
        let level = payload
            .get("level")
            .and_then(Value::as_str)
            .and_then(Level::parse);
        let behavior = payload
            .get("behavior")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { payload, sequence, unix_ms, direct, level, behavior }
    }

    /// Is this log important enough to bypass throttling?
    ///
    /// Critical if `direct` was requested by the caller, if the parsed level
    /// is ERROR or higher, or if `behavior` is in the allow-list. A malformed
    /// or absent payload simply yields `level = None, behavior = None`, which
    /// falls through to non-critical — never an error.
    pub fn is_critical(&self) -> bool {
        if self.direct {
            return true;
        }
        if self.level.is_some_and(Level::is_critical) {
            return true;
        }
        self.behavior
            .as_deref()
            .is_some_and(|b| CRITICAL_BEHAVIORS.contains(&b))
    }

    /// Render the emission payload: the caller's JSON object with
    /// `_sequence`, `_unix_time`, and `_original_time` injected. Non-object
    /// payloads are wrapped so the stamped fields still attach.
    pub fn stamped_payload(&self) -> Value {
        let mut obj = match &self.payload {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        let original_time = obj.get("time").cloned();
        obj.insert("_sequence".to_string(), Value::from(self.sequence));
        obj.insert("_unix_time".to_string(), Value::from(self.unix_ms));
        if let Some(original_time) = original_time {
            obj.insert("_original_time".to_string(), original_time);
        }
        Value::Object(obj)
    }
}

/// A last-write-wins progress update for a single `task_id`.
#[derive(Debug, Clone)]
pub struct ProgressRecord {
    pub task_id: String,
    pub fields: serde_json::Map<String, Value>,
}

impl ProgressRecord {
    pub fn new(task_id: impl Into<String>, fields: serde_json::Map<String, Value>) -> Self {
        Self { task_id: task_id.into(), fields }
    }

    /// Render the emission payload: `{"id": task_id, ...fields}`.
    pub fn payload(&self) -> Value {
        let mut obj = self.fields.clone();
        obj.insert("id".to_string(), Value::String(self.task_id.clone()));
        Value::Object(obj)
    }
}
