//! RC-007: Append-only JSONL provenance log, one per session.

use super::types::{RunEvent, TimestampedEvent};
use chrono::{SecondsFormat, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Derive the event log path inside a session directory.
pub fn event_log_path(session_dir: &Path) -> PathBuf {
    session_dir.join("events.jsonl")
}

/// Append an event to the session's event log.
pub fn append_event(session_dir: &Path, event: RunEvent) -> Result<(), String> {
    let path = event_log_path(session_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create session dir: {}", e))?;
    }

    let te = TimestampedEvent {
        ts: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;

    writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))?;

    Ok(())
}
