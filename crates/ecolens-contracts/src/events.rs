use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::content::{ErrorKind, NormalizedResult};

/// Lifecycle facts recorded by the submission controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    ImageSelected {
        file_name: String,
        media_type: String,
        bytes: u64,
        sha256: String,
    },
    ImageRejected {
        file_name: String,
        media_type: String,
    },
    SubmissionStarted {
        submission_id: String,
        transport: String,
    },
    SubmissionIgnored {
        state: String,
    },
    SubmissionCompleted {
        submission_id: String,
        status: String,
        blocks: u64,
        error_kind: Option<ErrorKind>,
        elapsed_ms: u64,
    },
    SubmissionAbandoned {
        submission_id: String,
    },
    SelectionReset,
}

impl LifecycleEvent {
    pub fn completed(submission_id: &str, result: &NormalizedResult, elapsed_ms: u64) -> Self {
        Self::SubmissionCompleted {
            submission_id: submission_id.to_string(),
            status: if result.is_success() {
                "success".to_string()
            } else {
                "failure".to_string()
            },
            blocks: result.blocks().len() as u64,
            error_kind: result.error_kind(),
            elapsed_ms,
        }
    }
}

/// Append-only JSONL journal. Each line is the serialized event plus
/// `session_id` and `ts`, one compact object per line.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn record(&self, event: &LifecycleEvent) -> anyhow::Result<Value> {
        let mut line = match serde_json::to_value(event)? {
            Value::Object(map) => map,
            other => anyhow::bail!("lifecycle event serialized to non-object: {other}"),
        };
        line.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        line.insert("ts".to_string(), Value::String(now_utc_iso()));
        self.append(&line)?;
        Ok(Value::Object(line))
    }

    fn append(&self, line: &Map<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_string(line)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(encoded.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::Value;

    use crate::content::{ErrorKind, NormalizedResult};

    use super::{EventWriter, LifecycleEvent};

    #[test]
    fn record_writes_compact_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-1");

        let emitted = writer.record(&LifecycleEvent::ImageSelected {
            file_name: "peel.png".to_string(),
            media_type: "image/png".to_string(),
            bytes: 3,
            sha256: "abc".to_string(),
        })?;

        let content = fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or("");
        let parsed: Value = serde_json::from_str(line)?;

        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], Value::String("image_selected".to_string()));
        assert_eq!(parsed["session_id"], Value::String("session-1".to_string()));
        assert_eq!(parsed["file_name"], Value::String("peel.png".to_string()));
        assert_eq!(parsed["bytes"], Value::from(3));

        let ts = parsed["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn record_creates_missing_parent_and_appends() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-1");

        writer.record(&LifecycleEvent::SelectionReset)?;
        writer.record(&LifecycleEvent::SubmissionIgnored {
            state: "idle".to_string(),
        })?;

        let content = fs::read_to_string(&path)?;
        let types: Vec<String> = content
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect();
        assert_eq!(types, vec!["selection_reset", "submission_ignored"]);
        Ok(())
    }

    #[test]
    fn completed_event_summarizes_failure() {
        let result = NormalizedResult::failure(ErrorKind::NetworkError, "timeout");
        let event = LifecycleEvent::completed("sub-1", &result, 12);
        assert_eq!(
            event,
            LifecycleEvent::SubmissionCompleted {
                submission_id: "sub-1".to_string(),
                status: "failure".to_string(),
                blocks: 0,
                error_kind: Some(ErrorKind::NetworkError),
                elapsed_ms: 12,
            }
        );
    }
}
