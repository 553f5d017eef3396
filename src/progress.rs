//! Ingestion progress reporting.
//!
//! Emits observable progress at each stage boundary of an ingestion run so
//! users can see what is being extracted, how much is left, and when the
//! knowledge base is up to date. Progress goes to **stderr** so stdout
//! remains parseable for scripts.

use std::io::Write;

use crate::ingest::IngestStage;

/// A progress event emitted at stage boundaries of an ingestion run.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    StageStarted { stage: IngestStage },
    DocumentsFound { count: u64 },
    Extracted { done: u64, total: u64, skipped: u64 },
    ChunksCreated { count: u64 },
    Embedded { done: u64, total: u64 },
    Persisted { count: u64 },
}

/// Reports ingestion progress. Implementations write to stderr.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress: "ingest  embedded 128 / 512 chunks".
pub struct HumanProgress;

impl ProgressReporter for HumanProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::StageStarted { stage } => format!("ingest  {}\n", stage),
            ProgressEvent::DocumentsFound { count } => {
                format!("ingest  found {} documents\n", count)
            }
            ProgressEvent::Extracted {
                done,
                total,
                skipped,
            } => format!(
                "ingest  extracted {} / {} documents ({} skipped)\n",
                done, total, skipped
            ),
            ProgressEvent::ChunksCreated { count } => {
                format!("ingest  created {} chunks\n", count)
            }
            ProgressEvent::Embedded { done, total } => {
                format!("ingest  embedded {} / {} chunks\n", done, total)
            }
            ProgressEvent::Persisted { count } => {
                format!("ingest  persisted {} chunks\n", count)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::StageStarted { stage } => serde_json::json!({
                "event": "stage",
                "stage": stage.to_string()
            }),
            ProgressEvent::DocumentsFound { count } => serde_json::json!({
                "event": "documents_found",
                "count": count
            }),
            ProgressEvent::Extracted {
                done,
                total,
                skipped,
            } => serde_json::json!({
                "event": "extracted",
                "done": done,
                "total": total,
                "skipped": skipped
            }),
            ProgressEvent::ChunksCreated { count } => serde_json::json!({
                "event": "chunks_created",
                "count": count
            }),
            ProgressEvent::Embedded { done, total } => serde_json::json!({
                "event": "embedded",
                "done": done,
                "total": total
            }),
            ProgressEvent::Persisted { count } => serde_json::json!({
                "event": "persisted",
                "count": count
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(HumanProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
