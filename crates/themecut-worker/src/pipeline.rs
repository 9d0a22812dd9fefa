//! The pipeline facade: one queue per stage plus shared status and events.

use themecut_media::SequenceConfig;
use themecut_models::{slugify, JobStatus, Stage};
use themecut_queue::{EventBroadcaster, StageQueue, Submission, Subscription};
use themecut_storage::{StatusStore, Workspace};

use crate::collaborators::Collaborators;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::stages::{
    ExportJob, ExportRunner, SegmentJob, SegmentRunner, SequenceJob, SequenceRunner, ThemeJob,
    ThemeRunner,
};

/// A stage submission, as accepted by [`Pipeline::submit`].
#[derive(Debug, Clone)]
pub enum StageRequest {
    Segment {
        video_id: String,
        force: bool,
    },
    Theme {
        theme: String,
        positives: Vec<String>,
        negatives: Vec<String>,
        video_ids: Vec<String>,
        force: bool,
    },
    Sequence {
        theme: String,
        config: SequenceConfig,
        video_ids: Vec<String>,
        force: bool,
    },
    Export {
        theme: String,
        video_id: Option<String>,
        edl_path: Option<String>,
        force: bool,
    },
}

/// Owns the four stage queues and the event fan-out.
pub struct Pipeline {
    workspace: Workspace,
    statuses: StatusStore,
    broadcaster: EventBroadcaster,
    segment: StageQueue<SegmentRunner>,
    theme: StageQueue<ThemeRunner>,
    sequence: StageQueue<SequenceRunner>,
    export: StageQueue<ExportRunner>,
}

impl Pipeline {
    /// Prepare the workspace layout and start one worker per stage.
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> PipelineResult<Self> {
        let workspace = Workspace::new(config.workspace_root);
        workspace.ensure_layout()?;
        let statuses = StatusStore::new(workspace.clone());
        let broadcaster = EventBroadcaster::new(config.event_capacity);

        let segment = StageQueue::new(
            SegmentRunner::new(
                workspace.clone(),
                config.segment,
                collaborators.keyframes.clone(),
                collaborators.embedder.clone(),
            ),
            statuses.clone(),
            broadcaster.clone(),
            workspace.queue_state_path(Stage::Segment),
        );
        let theme = StageQueue::new(
            ThemeRunner::new(
                workspace.clone(),
                config.theme_match,
                collaborators.text_encoder.clone(),
            ),
            statuses.clone(),
            broadcaster.clone(),
            workspace.queue_state_path(Stage::ThemeMatch),
        );
        let sequence = StageQueue::new(
            SequenceRunner::new(workspace.clone()),
            statuses.clone(),
            broadcaster.clone(),
            workspace.queue_state_path(Stage::Sequence),
        );
        let export = StageQueue::new(
            ExportRunner::new(workspace.clone(), collaborators.exporter.clone()),
            statuses.clone(),
            broadcaster.clone(),
            workspace.queue_state_path(Stage::Export),
        );

        Ok(Self {
            workspace,
            statuses,
            broadcaster,
            segment,
            theme,
            sequence,
            export,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Validate and enqueue a stage request.
    pub fn submit(&self, request: StageRequest) -> PipelineResult<Submission> {
        match request {
            StageRequest::Segment { video_id, force } => {
                let video_id = non_empty(&video_id, "video id")?;
                Ok(self.segment.enqueue(SegmentJob { video_id, force })?)
            }
            StageRequest::Theme {
                theme,
                positives,
                negatives,
                video_ids,
                force,
            } => {
                let (theme, slug) = theme_key(&theme)?;
                Ok(self.theme.enqueue(ThemeJob {
                    theme,
                    slug,
                    positives,
                    negatives,
                    video_ids,
                    force,
                })?)
            }
            StageRequest::Sequence {
                theme,
                config,
                video_ids,
                force,
            } => {
                let (theme, slug) = theme_key(&theme)?;
                let video_ids = if video_ids.is_empty() {
                    self.sequence_targets(&theme, &slug)?
                } else {
                    video_ids
                };
                Ok(self.sequence.enqueue(SequenceJob {
                    theme,
                    slug,
                    video_ids,
                    config,
                    force,
                })?)
            }
            StageRequest::Export {
                theme,
                video_id,
                edl_path,
                force,
            } => {
                let (theme, slug) = theme_key(&theme)?;
                Ok(self.export.enqueue(ExportJob {
                    theme,
                    slug,
                    video_id,
                    edl_path,
                    force,
                })?)
            }
        }
    }

    /// Videos a sequence job should cover: every video with scores.
    fn sequence_targets(&self, theme: &str, slug: &str) -> PipelineResult<Vec<String>> {
        let doc = self.workspace.read_scores(slug)?.ok_or_else(|| {
            PipelineError::not_found(format!(
                "no scores for theme '{theme}', run the theme stage first"
            ))
        })?;
        let video_ids = doc.video_ids();
        if video_ids.is_empty() {
            return Err(PipelineError::invalid_input(format!(
                "scores for theme '{theme}' cover no videos"
            )));
        }
        Ok(video_ids)
    }

    pub fn status(&self, stage: Stage, key: &str) -> PipelineResult<Option<JobStatus>> {
        Ok(self.statuses.read(stage, key)?)
    }

    pub fn snapshot(&self) -> PipelineResult<Vec<JobStatus>> {
        Ok(self.statuses.snapshot_all()?)
    }

    /// Subscribe to status events, starting from a snapshot of all stages.
    pub fn subscribe(&self) -> PipelineResult<Subscription> {
        Ok(self.broadcaster.subscribe(self.statuses.snapshot_all()?))
    }
}

fn non_empty(value: &str, what: &str) -> PipelineResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PipelineError::invalid_input(format!("{what} is empty")));
    }
    Ok(value.to_string())
}

fn theme_key(theme: &str) -> PipelineResult<(String, String)> {
    let theme = non_empty(theme, "theme name")?;
    let slug = slugify(&theme);
    if slug.is_empty() {
        return Err(PipelineError::invalid_input(format!(
            "theme name '{theme}' has no sluggable characters"
        )));
    }
    Ok((theme, slug))
}
