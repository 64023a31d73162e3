//! Diagnostic log sink
//!
//! Every lifecycle transition in the engine is appended to a [`LogSink`] as
//! a `{type, detail}` record and mirrored to `tracing`. Each detail object
//! carries `atMs`, the engine's monotonic time of the record. Appending is
//! best effort: sink failures are swallowed and never reach playback.

use crate::error::{PlaybackError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// One diagnostic record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Record class ("info", "error")
    #[serde(rename = "type")]
    pub kind: String,

    /// Event name, engine time (`atMs`) and relevant fields
    pub detail: serde_json::Value,
}

/// Append-only diagnostic store
pub trait LogSink: Send + Sync {
    fn append(&self, entry: LogEntry) -> Result<()>;
}

/// Entry as kept by [`MemoryLogSink`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLogEntry {
    pub time: DateTime<Utc>,

    #[serde(flatten)]
    pub entry: LogEntry,
}

/// Bounded in-memory log store
///
/// Keeps the most recent `capacity` entries, discarding the oldest.
#[derive(Debug)]
pub struct MemoryLogSink {
    entries: Mutex<VecDeque<StoredLogEntry>>,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of stored entries, oldest first
    pub fn entries(&self) -> Vec<StoredLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new(500)
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, entry: LogEntry) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PlaybackError::Sink(e.to_string()))?;

        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(StoredLogEntry {
            time: Utc::now(),
            entry,
        });
        Ok(())
    }
}

/// Engine-side handle to the optional sink
///
/// Clones share the engine clock, so records written by a controller are
/// stamped with the time of the call that drove it.
#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    sink: Option<Arc<dyn LogSink>>,
    now: Rc<Cell<Duration>>,
}

impl Diagnostics {
    pub(crate) fn new(sink: Option<Arc<dyn LogSink>>) -> Self {
        Self {
            sink,
            now: Rc::default(),
        }
    }

    /// Record the host time of the current entry point
    pub(crate) fn set_now(&self, now: Duration) {
        self.now.set(now);
    }

    pub(crate) fn info(&self, detail: serde_json::Value) {
        let detail = self.stamp(detail);
        debug!(target: "signage_playback::events", %detail);
        self.append("info", detail);
    }

    pub(crate) fn error(&self, detail: serde_json::Value) {
        let detail = self.stamp(detail);
        warn!(target: "signage_playback::events", %detail);
        self.append("error", detail);
    }

    fn stamp(&self, mut detail: serde_json::Value) -> serde_json::Value {
        if let Some(fields) = detail.as_object_mut() {
            let at_ms = u64::try_from(self.now.get().as_millis()).unwrap_or(u64::MAX);
            fields.insert("atMs".to_string(), at_ms.into());
        }
        detail
    }

    fn append(&self, kind: &str, detail: serde_json::Value) {
        let Some(sink) = &self.sink else {
            return;
        };
        let entry = LogEntry {
            kind: kind.to_string(),
            detail,
        };
        if let Err(e) = sink.append(entry) {
            debug!(error = %e, "Log sink append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingSink;

    impl LogSink for FailingSink {
        fn append(&self, _entry: LogEntry) -> Result<()> {
            Err(PlaybackError::Sink("storage full".to_string()))
        }
    }

    #[test]
    fn memory_sink_is_bounded() {
        let sink = MemoryLogSink::new(2);
        for n in 0..3 {
            sink.append(LogEntry {
                kind: "info".to_string(),
                detail: json!({ "n": n }),
            })
            .unwrap();
        }

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry.detail["n"], 1);
        assert_eq!(entries[1].entry.detail["n"], 2);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn stored_entry_serializes_flat() {
        let stored = StoredLogEntry {
            time: Utc::now(),
            entry: LogEntry {
                kind: "error".to_string(),
                detail: json!({ "event": "error", "code": 3 }),
            },
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["detail"]["code"], 3);
        assert!(value["time"].is_string());
    }

    #[test]
    fn diagnostics_swallow_sink_failures() {
        let diagnostics = Diagnostics::new(Some(Arc::new(FailingSink)));
        diagnostics.info(json!({ "event": "play" }));
        diagnostics.error(json!({ "event": "error" }));
    }

    #[test]
    fn diagnostics_stamp_engine_time() {
        let sink = Arc::new(MemoryLogSink::default());
        let diagnostics = Diagnostics::new(Some(sink.clone() as Arc<dyn LogSink>));
        let controller_side = diagnostics.clone();

        diagnostics.info(json!({ "event": "start" }));
        diagnostics.set_now(Duration::from_millis(4_250));
        controller_side.info(json!({ "event": "play" }));

        let entries = sink.entries();
        assert_eq!(entries[0].entry.detail["atMs"], 0);
        assert_eq!(entries[1].entry.detail["atMs"], 4_250);
        assert_eq!(entries[1].entry.detail["event"], "play");
    }

    #[test]
    fn diagnostics_forward_kind() {
        let sink = Arc::new(MemoryLogSink::default());
        let diagnostics = Diagnostics::new(Some(sink.clone() as Arc<dyn LogSink>));
        diagnostics.info(json!({ "event": "waiting" }));
        diagnostics.error(json!({ "event": "error" }));

        let kinds: Vec<_> = sink.entries().into_iter().map(|e| e.entry.kind).collect();
        assert_eq!(kinds, ["info", "error"]);
    }
}
