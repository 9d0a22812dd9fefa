//! Sequence stage: turn per-clip theme scores into edit decision lists.

use std::fs;

use async_trait::async_trait;
use tracing::info;

use themecut_media::{SequenceConfig, Sequencer};
use themecut_models::{Stage, ThemeScore};
use themecut_queue::{CacheState, ProgressHandle, StageJob, StageRunner};
use themecut_storage::{ScoresDocument, StorageError, Workspace};

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SequenceJob {
    pub theme: String,
    pub slug: String,
    /// Resolved at submission time; never empty once queued.
    pub video_ids: Vec<String>,
    #[serde(default)]
    pub config: SequenceConfig,
    #[serde(default)]
    pub force: bool,
}

impl StageJob for SequenceJob {
    fn key(&self) -> &str {
        &self.slug
    }

    fn force(&self) -> bool {
        self.force
    }
}

pub struct SequenceRunner {
    workspace: Workspace,
}

impl SequenceRunner {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    fn load_scores(&self, job: &SequenceJob) -> PipelineResult<ScoresDocument> {
        match self.workspace.read_scores(&job.slug) {
            Ok(Some(doc)) => Ok(doc),
            Ok(None) => Err(PipelineError::not_found(format!(
                "no scores for theme '{}', run the theme stage first",
                job.theme
            ))),
            Err(StorageError::Json(e)) => Err(PipelineError::invalid_input(format!(
                "scores document for '{}' is malformed: {e}",
                job.theme
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StageRunner for SequenceRunner {
    type Job = SequenceJob;
    type Error = PipelineError;

    fn stage(&self) -> Stage {
        Stage::Sequence
    }

    fn cache_state(&self, job: &SequenceJob) -> CacheState {
        let total = job.video_ids.len();
        let cached = job
            .video_ids
            .iter()
            .filter(|v| self.workspace.edl_path(&job.slug, v).exists())
            .count();
        if total == 0 || cached == 0 {
            CacheState::Miss
        } else if cached == total {
            CacheState::Full
        } else {
            CacheState::Partial {
                progress: cached as f64 / total as f64,
            }
        }
    }

    fn clear_artifacts(&self, job: &SequenceJob) -> PipelineResult<()> {
        for video_id in &job.video_ids {
            let path = self.workspace.edl_path(&job.slug, video_id);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn result_path(&self, job: &SequenceJob) -> String {
        let video_id = job.video_ids.first().map(String::as_str).unwrap_or("");
        self.workspace
            .relative_locator(&self.workspace.edl_path(&job.slug, video_id))
    }

    async fn run(&self, job: &SequenceJob, progress: &ProgressHandle) -> PipelineResult<String> {
        let doc = self.load_scores(job)?;
        let sequencer = Sequencer::new(&job.config);
        let total = job.video_ids.len();

        let mut sequenced = 0usize;
        for (i, video_id) in job.video_ids.iter().enumerate() {
            if !job.force && self.workspace.edl_path(&job.slug, video_id).exists() {
                progress.update((i + 1) as f64 / total as f64, format!("cached {video_id}"))?;
                continue;
            }
            let clips = self.workspace.read_clips(video_id)?.unwrap_or_default();
            let entries = doc.scores.get(video_id).cloned().unwrap_or_default();
            if clips.is_empty() || entries.is_empty() {
                info!(video_id, theme = %job.theme, "skipping video without clips or scores");
                progress.update((i + 1) as f64 / total as f64, format!("skipped {video_id}"))?;
                continue;
            }
            let scores: Vec<ThemeScore> = entries
                .iter()
                .map(|entry| ThemeScore {
                    clip_id: entry.clip_id,
                    video_id: video_id.clone(),
                    theme: doc.meta.theme.clone(),
                    score: entry.score,
                    s_pos: entry.s_pos,
                    s_neg: entry.s_neg,
                    embedding_model: doc.meta.embedding_model.clone(),
                    created_at: doc.meta.created_at,
                    metadata: Default::default(),
                })
                .collect();
            let result = sequencer.sequence(&clips, &scores);
            self.workspace.write_edl(&job.slug, video_id, &result.edl)?;
            sequenced += 1;
            progress.update(
                (i + 1) as f64 / total as f64,
                format!("sequenced {video_id}"),
            )?;
        }

        info!(
            theme = %job.theme,
            slug = %job.slug,
            sequenced,
            videos = total,
            "sequencing complete"
        );
        Ok(self.result_path(job))
    }
}
