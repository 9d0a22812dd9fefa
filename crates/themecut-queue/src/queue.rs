//! Generic single-worker stage queue.
//!
//! The four pipeline stages share one queue implementation, parameterized by
//! a `StageRunner`. The runner decides what counts as a cache hit, how to
//! clear artifacts on `force`, and what the run itself does; the queue owns
//! dedup, FIFO order, status records, events and crash recovery.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use themecut_models::{JobState, JobStatus, PipelineEvent, Stage};
use themecut_storage::{atomic_write_json, read_json_opt, StatusStore};

use crate::error::{QueueError, QueueResult};
use crate::events::EventBroadcaster;
use crate::progress::ProgressHandle;

/// A job accepted by a stage queue. The key identifies the unit of work for
/// dedup and status records.
pub trait StageJob:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    fn key(&self) -> &str;
    fn force(&self) -> bool;
}

/// What the artifact cache knows about a job before it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheState {
    /// Nothing usable on disk.
    Miss,
    /// Part of a fan-out batch is already done; the job still runs for the
    /// remainder. `progress` is the completed fraction.
    Partial { progress: f64 },
    /// All outputs exist; the job does not run.
    Full,
}

/// Stage-specific behavior plugged into a `StageQueue`.
#[async_trait]
pub trait StageRunner: Send + Sync + 'static {
    type Job: StageJob;
    type Error: std::error::Error + Send + Sync + 'static;

    fn stage(&self) -> Stage;

    /// Artifact-presence check, consulted at enqueue when `force` is unset.
    fn cache_state(&self, job: &Self::Job) -> CacheState;

    /// Remove the job's outputs ahead of a forced re-run.
    fn clear_artifacts(&self, job: &Self::Job) -> Result<(), Self::Error>;

    /// Workspace-relative locator of the job's primary output.
    fn result_path(&self, job: &Self::Job) -> String;

    /// Execute the job, reporting progress along the way. Returns the
    /// locator recorded in the `Done` status.
    async fn run(&self, job: &Self::Job, progress: &ProgressHandle)
        -> Result<String, Self::Error>;
}

/// Enqueue outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Submission {
    /// Accepted; the worker will pick it up in FIFO order.
    Queued,
    /// Outputs already exist; nothing was queued.
    Cached { result_path: Option<String> },
    /// The same key is already pending or running.
    Skipped,
}

/// Persisted pending/active document, `{stage_dir}/queue.json`.
#[derive(Debug, Serialize, Deserialize)]
struct QueueStateDoc<J> {
    pending: Vec<J>,
    active: Option<J>,
    updated_at: DateTime<Utc>,
}

struct QueueState<J> {
    pending: VecDeque<J>,
    active: Option<J>,
}

struct QueueInner<R: StageRunner> {
    runner: R,
    statuses: StatusStore,
    broadcaster: EventBroadcaster,
    state_path: PathBuf,
    state: Mutex<QueueState<R::Job>>,
    wakeup: Notify,
}

/// FIFO of deduplicated jobs for one stage, drained by a single worker task.
pub struct StageQueue<R: StageRunner> {
    inner: Arc<QueueInner<R>>,
    worker: JoinHandle<()>,
}

impl<R: StageRunner> StageQueue<R> {
    /// Build the queue and start its worker. Pending and active jobs from a
    /// previous process are restored, with a crashed active job re-queued at
    /// the front.
    pub fn new(
        runner: R,
        statuses: StatusStore,
        broadcaster: EventBroadcaster,
        state_path: PathBuf,
    ) -> Self {
        let mut pending: VecDeque<R::Job> = VecDeque::new();
        match read_json_opt::<QueueStateDoc<R::Job>>(&state_path) {
            Ok(Some(doc)) => {
                pending.extend(doc.pending);
                if let Some(active) = doc.active {
                    info!(
                        stage = runner.stage().as_str(),
                        key = active.key(),
                        "re-queueing job interrupted by restart"
                    );
                    pending.push_front(active);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                stage = runner.stage().as_str(),
                error = %e,
                "ignoring unreadable queue state"
            ),
        }

        let inner = Arc::new(QueueInner {
            runner,
            statuses,
            broadcaster,
            state_path,
            state: Mutex::new(QueueState {
                pending,
                active: None,
            }),
            wakeup: Notify::new(),
        });
        if let Err(e) = inner.persist(&inner.lock_state()) {
            warn!(error = %e, "failed to persist restored queue state");
        }

        let worker = tokio::spawn(worker_loop(Arc::clone(&inner)));
        if inner.lock_state().pending.front().is_some() {
            inner.wakeup.notify_one();
        }
        Self { inner, worker }
    }

    pub fn stage(&self) -> Stage {
        self.inner.runner.stage()
    }

    /// Submit a job. Never blocks on a running job; the lock is held only
    /// for the dedup check and FIFO push.
    pub fn enqueue(&self, job: R::Job) -> QueueResult<Submission> {
        let key = job.key().to_string();
        if key.is_empty() {
            return Err(QueueError::invalid_key("job key must not be empty"));
        }
        let stage = self.inner.runner.stage();

        if job.force() {
            self.inner
                .runner
                .clear_artifacts(&job)
                .map_err(QueueError::runner)?;
            self.inner.statuses.clear(stage, &key)?;
        } else {
            match self.inner.runner.cache_state(&job) {
                CacheState::Full => {
                    let result_path = self.inner.runner.result_path(&job);
                    self.inner.write_status(
                        &key,
                        JobState::cached(1.0),
                        Some(result_path.clone()),
                    )?;
                    debug!(stage = stage.as_str(), key, "cache hit");
                    return Ok(Submission::Cached {
                        result_path: Some(result_path),
                    });
                }
                CacheState::Partial { progress } => {
                    self.inner
                        .write_status(&key, JobState::cached(progress), None)?;
                }
                CacheState::Miss => {}
            }
        }

        {
            let mut state = self.inner.lock_state();
            let duplicate = state
                .active
                .as_ref()
                .map(|j| j.key() == key)
                .unwrap_or(false)
                || state.pending.iter().any(|j| j.key() == key);
            if duplicate {
                debug!(stage = stage.as_str(), key, "duplicate submission skipped");
                return Ok(Submission::Skipped);
            }
            state.pending.push_back(job);
            self.inner.persist(&state)?;
        }

        self.inner.write_status(&key, JobState::Queued, None)?;
        self.inner.wakeup.notify_one();
        Ok(Submission::Queued)
    }

    /// Durable status for one key.
    pub fn status(&self, key: &str) -> QueueResult<Option<JobStatus>> {
        Ok(self.inner.statuses.read(self.stage(), key)?)
    }

    /// All durable statuses for this stage.
    pub fn snapshot(&self) -> QueueResult<Vec<JobStatus>> {
        Ok(self.inner.statuses.snapshot(self.stage())?)
    }
}

impl<R: StageRunner> Drop for StageQueue<R> {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl<R: StageRunner> QueueInner<R> {
    fn lock_state(&self) -> MutexGuard<'_, QueueState<R::Job>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &QueueState<R::Job>) -> QueueResult<()> {
        let doc = QueueStateDoc {
            pending: state.pending.iter().cloned().collect(),
            active: state.active.clone(),
            updated_at: Utc::now(),
        };
        atomic_write_json(&self.state_path, &doc)?;
        Ok(())
    }

    fn write_status(
        &self,
        key: &str,
        state: JobState,
        result_path: Option<String>,
    ) -> QueueResult<()> {
        let status = JobStatus::new(self.runner.stage(), key, state);
        self.statuses.write(&status)?;
        self.broadcaster
            .publish(PipelineEvent::status(&status, result_path));
        Ok(())
    }
}

async fn worker_loop<R: StageRunner>(inner: Arc<QueueInner<R>>) {
    let stage = inner.runner.stage();
    loop {
        let job = {
            let mut state = inner.lock_state();
            match state.pending.pop_front() {
                Some(job) => {
                    state.active = Some(job.clone());
                    if let Err(e) = inner.persist(&state) {
                        warn!(stage = stage.as_str(), error = %e, "failed to persist queue state");
                    }
                    Some(job)
                }
                None => None,
            }
        };

        let Some(job) = job else {
            inner.wakeup.notified().await;
            continue;
        };

        run_one(&inner, &job).await;

        let mut state = inner.lock_state();
        state.active = None;
        if let Err(e) = inner.persist(&state) {
            warn!(stage = stage.as_str(), error = %e, "failed to persist queue state");
        }
    }
}

/// Run one job to a terminal status. Failures are contained: the error lands
/// in the status record and the loop moves on.
async fn run_one<R: StageRunner>(inner: &Arc<QueueInner<R>>, job: &R::Job) {
    let stage = inner.runner.stage();
    let key = job.key().to_string();
    let progress = ProgressHandle::new(
        stage,
        &key,
        inner.statuses.clone(),
        inner.broadcaster.clone(),
    );
    if let Err(e) = progress.begin() {
        warn!(stage = stage.as_str(), key, error = %e, "failed to write initial status");
    }

    match inner.runner.run(job, &progress).await {
        Ok(result_path) => {
            info!(stage = stage.as_str(), key, result_path, "job done");
            if let Err(e) = inner.write_status(&key, JobState::done(result_path), None) {
                error!(stage = stage.as_str(), key, error = %e, "failed to record done status");
            }
        }
        Err(run_err) => {
            warn!(stage = stage.as_str(), key, error = %run_err, "job failed");
            if let Err(e) = inner.write_status(&key, JobState::error(run_err.to_string()), None) {
                error!(stage = stage.as_str(), key, error = %e, "failed to record error status");
            }
        }
    }
}
