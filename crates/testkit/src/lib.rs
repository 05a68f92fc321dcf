#![warn(missing_docs)]
//! Deterministic testing surfaces: the behavior event stream and tick traces.

mod trace;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use xrscene_core::SimTick;

pub use trace::*;

/// Primary event record captured by headless runs.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Name of the behavior (or host surface) that produced the event.
    pub source: &'a str,
    /// Event kind label, e.g. `pressed`.
    pub kind: &'a str,
    /// Structured payload.
    pub payload: Value,
}

/// Owned copy of an [`EventRecord`], as read back from a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Producing behavior.
    pub source: String,
    /// Event kind label.
    pub kind: String,
    /// Structured payload.
    #[serde(default)]
    pub payload: Value,
}

impl LoggedEvent {
    fn from_record(event: &EventRecord<'_>) -> Self {
        Self {
            tick: event.tick,
            source: event.source.to_string(),
            kind: event.kind.to_string(),
            payload: event.payload.clone(),
        }
    }
}

/// Destination for behavior events.
pub trait EventSink {
    /// Record one event.
    fn write(&mut self, event: &EventRecord<'_>) -> Result<()>;

    /// Push buffered events to their destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: BufWriter<File>,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Ok(Self {
            file: BufWriter::new(file),
        })
    }
}

impl EventSink for JsonlSink {
    fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// In-memory event log for assertions.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<LoggedEvent>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events in order.
    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    /// Events of one kind from one source.
    pub fn matching<'a>(
        &'a self,
        source: &'a str,
        kind: &'a str,
    ) -> impl Iterator<Item = &'a LoggedEvent> + 'a {
        self.events
            .iter()
            .filter(move |e| e.source == source && e.kind == kind)
    }

    /// Number of events of one kind from one source.
    pub fn count(&self, source: &str, kind: &str) -> usize {
        self.matching(source, kind).count()
    }
}

impl EventSink for EventLog {
    fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        self.events.push(LoggedEvent::from_record(event));
        Ok(())
    }
}

/// Read a newline-delimited JSON event log back into memory.
pub fn read_jsonl<P: AsRef<Path>>(path: P) -> Result<Vec<LoggedEvent>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read event log {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Bad event on line {} of {}", index + 1, path.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "xrscene-{name}-{}.jsonl",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn jsonl_sink_round_trips_through_reader() {
        let path = temp_path("sink");
        let mut sink = JsonlSink::create(&path).expect("sink create");
        sink.write(&EventRecord {
            tick: SimTick(3),
            source: "door_button",
            kind: "pressed",
            payload: json!({ "travel": 0.01 }),
        })
        .expect("write succeeds");
        sink.flush().expect("flush succeeds");

        let events = read_jsonl(&path).expect("log readable");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tick, SimTick(3));
        assert_eq!(events[0].kind, "pressed");
        assert_eq!(events[0].payload["travel"], json!(0.01));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn event_log_counts_by_source_and_kind() {
        let mut log = EventLog::new();
        for (source, kind) in [("a", "pressed"), ("a", "released"), ("b", "pressed")] {
            log.write(&EventRecord {
                tick: SimTick::ZERO,
                source,
                kind,
                payload: Value::Null,
            })
            .unwrap();
        }
        assert_eq!(log.count("a", "pressed"), 1);
        assert_eq!(log.count("b", "released"), 0);
        assert_eq!(log.events().len(), 3);
    }
}
