//! Durable job status records.
//!
//! One `status.json` per `(stage, key)`, written atomically. The store is
//! the source of truth for job state across restarts; the in-memory queues
//! only decide what runs next.

use std::fs;

use tracing::warn;

use themecut_models::{JobStatus, Stage};

use crate::artifacts::{atomic_write_json, read_json_opt};
use crate::error::{StorageError, StorageResult};
use crate::workspace::Workspace;

#[derive(Debug, Clone)]
pub struct StatusStore {
    workspace: Workspace,
}

impl StatusStore {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    pub fn write(&self, status: &JobStatus) -> StorageResult<()> {
        let path = self.workspace.status_path(status.stage, &status.key);
        atomic_write_json(&path, status)
    }

    /// Malformed records read as `None`; a half-written file must never take
    /// the pipeline down.
    pub fn read(&self, stage: Stage, key: &str) -> StorageResult<Option<JobStatus>> {
        let path = self.workspace.status_path(stage, key);
        match read_json_opt(&path) {
            Ok(status) => Ok(status),
            Err(StorageError::Json(e)) => {
                warn!(stage = stage.as_str(), key, error = %e, "skipping malformed status record");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn clear(&self, stage: Stage, key: &str) -> StorageResult<()> {
        let path = self.workspace.status_path(stage, key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All known statuses for one stage, sorted by key.
    pub fn snapshot(&self, stage: Stage) -> StorageResult<Vec<JobStatus>> {
        let dir = self.workspace.stage_dir(stage);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut statuses = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(key) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(status) = self.read(stage, key)? {
                statuses.push(status);
            }
        }
        statuses.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(statuses)
    }

    /// Statuses across all four stages, in stage order.
    pub fn snapshot_all(&self) -> StorageResult<Vec<JobStatus>> {
        let mut all = Vec::new();
        for stage in Stage::ALL {
            all.extend(self.snapshot(stage)?);
        }
        Ok(all)
    }
}
