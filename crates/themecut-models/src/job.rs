//! Job status records persisted by the status store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage identifier. Each stage owns one job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Segment,
    ThemeMatch,
    Sequence,
    Export,
}

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Segment,
        Stage::ThemeMatch,
        Stage::Sequence,
        Stage::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Segment => "segment",
            Stage::ThemeMatch => "theme_match",
            Stage::Sequence => "sequence",
            Stage::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current state of a job, as a tagged variant so every consumer handles all
/// states exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the stage's FIFO
    Queued,
    /// Actively executing; progress is non-decreasing within a run
    Running { progress: f64, message: String },
    /// Output artifact already present, no run started.
    /// Progress is 1.0, or the cached fraction for a partially cached batch.
    Cached { progress: f64 },
    /// Completed; `result_path` locates the output artifact
    Done { result_path: String },
    /// Failed; the worker loop continues with the next job
    Error { message: String },
}

impl JobState {
    pub fn running(progress: f64, message: impl Into<String>) -> Self {
        JobState::Running {
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn cached(progress: f64) -> Self {
        JobState::Cached {
            progress: progress.clamp(0.0, 1.0),
        }
    }

    pub fn done(result_path: impl Into<String>) -> Self {
        JobState::Done {
            result_path: result_path.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        JobState::Error {
            message: message.into(),
        }
    }

    /// Terminal states receive no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Cached { .. } | JobState::Done { .. } | JobState::Error { .. }
        )
    }

    /// Progress in [0, 1] regardless of variant.
    pub fn progress(&self) -> f64 {
        match self {
            JobState::Queued => 0.0,
            JobState::Running { progress, .. } => *progress,
            JobState::Cached { progress } => *progress,
            JobState::Done { .. } => 1.0,
            JobState::Error { .. } => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running { .. } => "running",
            JobState::Cached { .. } => "cached",
            JobState::Done { .. } => "done",
            JobState::Error { .. } => "error",
        }
    }
}

/// Persisted status record for one `(stage, key)` job.
///
/// Outlives the in-memory job and is the source of truth for polling,
/// independent of the queue that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub stage: Stage,
    pub key: String,
    #[serde(flatten)]
    pub state: JobState,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    pub fn new(stage: Stage, key: impl Into<String>, state: JobState) -> Self {
        Self {
            stage,
            key: key.into(),
            state,
            updated_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
