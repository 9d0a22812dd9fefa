//! Theme stage: score every segmented clip against a theme query.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use themecut_media::{score_clips, PrototypeEmbeddings, ThemeMatchConfig};
use themecut_models::{Clip, Stage, ThemeQuery, ThemeScore};
use themecut_queue::{CacheState, ProgressHandle, StageJob, StageRunner};
use themecut_storage::{ScoreEntry, ScoresDocument, ScoresMeta, Workspace};

use crate::collaborators::TextEncoder;
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ThemeJob {
    pub theme: String,
    pub slug: String,
    #[serde(default)]
    pub positives: Vec<String>,
    #[serde(default)]
    pub negatives: Vec<String>,
    /// Empty means every segmented video.
    #[serde(default)]
    pub video_ids: Vec<String>,
    #[serde(default)]
    pub force: bool,
}

impl StageJob for ThemeJob {
    fn key(&self) -> &str {
        &self.slug
    }

    fn force(&self) -> bool {
        self.force
    }
}

pub struct ThemeRunner {
    workspace: Workspace,
    config: ThemeMatchConfig,
    text_encoder: Arc<dyn TextEncoder>,
}

impl ThemeRunner {
    pub fn new(
        workspace: Workspace,
        config: ThemeMatchConfig,
        text_encoder: Arc<dyn TextEncoder>,
    ) -> Self {
        Self {
            workspace,
            config,
            text_encoder,
        }
    }

    fn encode_prototypes(&self, query: &ThemeQuery) -> PipelineResult<PrototypeEmbeddings> {
        Ok(PrototypeEmbeddings {
            positives: self.text_encoder.encode_texts(&query.positive_texts())?,
            negatives: self.text_encoder.encode_texts(&query.negative_texts())?,
        })
    }
}

#[async_trait]
impl StageRunner for ThemeRunner {
    type Job = ThemeJob;
    type Error = PipelineError;

    fn stage(&self) -> Stage {
        Stage::ThemeMatch
    }

    fn cache_state(&self, job: &ThemeJob) -> CacheState {
        if self.workspace.scores_path(&job.slug).exists() {
            CacheState::Full
        } else {
            CacheState::Miss
        }
    }

    fn clear_artifacts(&self, job: &ThemeJob) -> PipelineResult<()> {
        let path = self.workspace.scores_path(&job.slug);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn result_path(&self, job: &ThemeJob) -> String {
        self.workspace
            .relative_locator(&self.workspace.scores_path(&job.slug))
    }

    async fn run(&self, job: &ThemeJob, progress: &ProgressHandle) -> PipelineResult<String> {
        let video_ids = if job.video_ids.is_empty() {
            self.workspace.list_segmented()?
        } else {
            job.video_ids.clone()
        };
        if video_ids.is_empty() {
            return Err(PipelineError::invalid_input(
                "no segmented videos to score against",
            ));
        }

        let mut clips_by_video: BTreeMap<String, Vec<Clip>> = BTreeMap::new();
        for video_id in &video_ids {
            if let Some(clips) = self.workspace.read_clips(video_id)? {
                if !clips.is_empty() {
                    clips_by_video.insert(video_id.clone(), clips);
                }
            }
        }
        let total_clips: usize = clips_by_video.values().map(Vec::len).sum();
        if total_clips == 0 {
            return Err(PipelineError::invalid_input(format!(
                "no clips found for theme '{}'",
                job.theme
            )));
        }

        let embedding_model = {
            let models: std::collections::BTreeSet<&str> = clips_by_video
                .values()
                .flatten()
                .map(|c| c.embedding_model.as_str())
                .collect();
            if models.len() != 1 {
                return Err(PipelineError::invalid_input(format!(
                    "clips span multiple embedding models: {models:?}"
                )));
            }
            models.into_iter().next().unwrap_or_default().to_string()
        };

        let query = ThemeQuery::from_keywords(&job.theme, &job.positives, &job.negatives);
        let mean_color = embedding_model.to_lowercase().starts_with("mean-color");
        let prototypes = if mean_color {
            warn!(
                theme = %job.theme,
                model = %embedding_model,
                "embedding model lacks text alignment, scores fall back to zero"
            );
            None
        } else {
            Some(self.encode_prototypes(&query)?)
        };

        let mut doc = ScoresDocument {
            meta: ScoresMeta {
                theme: job.theme.clone(),
                theme_slug: job.slug.clone(),
                created_at: Utc::now(),
                positives: query.positive_texts(),
                negatives: query.negative_texts(),
                embedding_model: embedding_model.clone(),
            },
            scores: BTreeMap::new(),
        };

        let mut processed = 0usize;
        for (video_id, clips) in &clips_by_video {
            let scores = match &prototypes {
                Some(protos) => score_clips(clips, &job.theme, protos, &self.config)?,
                None => zero_scores(clips, &job.theme),
            };
            let mut entries: Vec<ScoreEntry> = scores
                .iter()
                .filter_map(|score| {
                    clips
                        .iter()
                        .find(|c| c.clip_id == score.clip_id)
                        .map(|clip| ScoreEntry {
                            clip_id: score.clip_id,
                            score: score.score,
                            s_pos: score.s_pos,
                            s_neg: score.s_neg,
                            t_start: clip.t_start,
                            t_end: clip.t_end,
                        })
                })
                .collect();
            entries.sort_by(|a, b| a.t_start.total_cmp(&b.t_start));
            doc.scores.insert(video_id.clone(), entries);

            processed += clips.len();
            progress.update(
                processed as f64 / total_clips as f64,
                format!("scoring {video_id}"),
            )?;
        }

        self.workspace.write_scores(&job.slug, &doc)?;
        info!(
            theme = %job.theme,
            slug = %job.slug,
            videos = doc.scores.len(),
            clips = total_clips,
            "theme scoring complete"
        );
        Ok(self.result_path(job))
    }
}

/// Scores for clips whose embedding model has no text alignment.
fn zero_scores(clips: &[Clip], theme: &str) -> Vec<ThemeScore> {
    let now = Utc::now();
    clips
        .iter()
        .map(|clip| ThemeScore {
            clip_id: clip.clip_id,
            video_id: clip.video_id.clone(),
            theme: theme.to_string(),
            score: 0.0,
            s_pos: 0.0,
            s_neg: 0.0,
            embedding_model: clip.embedding_model.clone(),
            created_at: now,
            metadata: [("mode".to_string(), "mean_color".to_string())].into(),
        })
        .collect()
}
