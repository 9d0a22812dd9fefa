//! Live pipeline events.
//!
//! Events are ephemeral: delivered best-effort to live subscribers, never
//! persisted. The durable record is the `JobStatus` document.

use serde::{Deserialize, Serialize};

use crate::job::{JobState, JobStatus, Stage};

/// Message delivered to event subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Current state of every known job, sent once per new subscriber before
    /// any live event.
    Snapshot { statuses: Vec<JobStatus> },

    /// A job status transition or progress update.
    Status {
        stage: Stage,
        key: String,
        #[serde(flatten)]
        state: JobState,
        #[serde(skip_serializing_if = "Option::is_none")]
        result_path: Option<String>,
    },

    /// Emitted periodically while idle so long-lived subscribers are never
    /// silently starved.
    Keepalive,
}

impl PipelineEvent {
    /// Build a status event from a persisted record.
    ///
    /// `result_path` is filled from a `Done` state automatically; cached
    /// events pass the locator explicitly since `Cached` does not carry one.
    pub fn status(status: &JobStatus, result_path: Option<String>) -> Self {
        let result_path = match &status.state {
            JobState::Done { result_path } => Some(result_path.clone()),
            _ => result_path,
        };
        PipelineEvent::Status {
            stage: status.stage,
            key: status.key.clone(),
            state: status.state.clone(),
            result_path,
        }
    }

    pub fn snapshot(statuses: Vec<JobStatus>) -> Self {
        PipelineEvent::Snapshot { statuses }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_carries_done_locator() {
        let status = JobStatus::new(Stage::Sequence, "sunset", JobState::done("edl/sunset"));
        let event = PipelineEvent::status(&status, None);
        match &event {
            PipelineEvent::Status { result_path, .. } => {
                assert_eq!(result_path.as_deref(), Some("edl/sunset"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn event_serialization_is_tagged() {
        let json = serde_json::to_value(PipelineEvent::Keepalive).unwrap();
        assert_eq!(json["type"], "keepalive");

        let status = JobStatus::new(Stage::Segment, "v1", JobState::Queued);
        let json = serde_json::to_value(PipelineEvent::status(&status, None)).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["state"], "queued");
        assert!(json.get("result_path").is_none());
    }
}
