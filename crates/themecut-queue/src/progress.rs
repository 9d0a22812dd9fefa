//! Per-run progress reporting.

use std::sync::Mutex;

use themecut_models::{JobState, JobStatus, PipelineEvent, Stage};
use themecut_storage::StatusStore;

use crate::error::QueueResult;
use crate::events::EventBroadcaster;

/// Handle given to a stage run for reporting progress.
///
/// Progress is clamped to [0, 1] and non-decreasing within a run: a lower
/// value than the last reported one is raised to it. Updates that change
/// neither progress nor message are dropped.
pub struct ProgressHandle {
    stage: Stage,
    key: String,
    statuses: StatusStore,
    broadcaster: EventBroadcaster,
    last: Mutex<(f64, String)>,
}

impl ProgressHandle {
    pub fn new(
        stage: Stage,
        key: impl Into<String>,
        statuses: StatusStore,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            stage,
            key: key.into(),
            statuses,
            broadcaster,
            last: Mutex::new((0.0, String::new())),
        }
    }

    /// Mark the run as started.
    pub fn begin(&self) -> QueueResult<()> {
        self.write(0.0, "started".to_string())
    }

    pub fn update(&self, progress: f64, message: impl Into<String>) -> QueueResult<()> {
        let message = message.into();
        let progress = {
            let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
            let clamped = progress.clamp(0.0, 1.0).max(last.0);
            if clamped == last.0 && message == last.1 {
                return Ok(());
            }
            clamped
        };
        self.write(progress, message)
    }

    fn write(&self, progress: f64, message: String) -> QueueResult<()> {
        let status = JobStatus::new(
            self.stage,
            &self.key,
            JobState::running(progress, message.clone()),
        );
        self.statuses.write(&status)?;
        self.broadcaster.publish(PipelineEvent::status(&status, None));
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = (progress, message);
        Ok(())
    }
}
