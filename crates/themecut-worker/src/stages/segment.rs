//! Segment stage: source video to clips document.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use themecut_media::{segment_samples, EmbeddedSample, SegmentConfig};
use themecut_models::Stage;
use themecut_queue::{CacheState, ProgressHandle, StageJob, StageRunner};
use themecut_storage::Workspace;

use crate::collaborators::{FrameEmbedder, KeyframeSource};
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SegmentJob {
    pub video_id: String,
    #[serde(default)]
    pub force: bool,
}

impl StageJob for SegmentJob {
    fn key(&self) -> &str {
        &self.video_id
    }

    fn force(&self) -> bool {
        self.force
    }
}

pub struct SegmentRunner {
    workspace: Workspace,
    config: SegmentConfig,
    keyframes: Arc<dyn KeyframeSource>,
    embedder: Arc<dyn FrameEmbedder>,
}

impl SegmentRunner {
    pub fn new(
        workspace: Workspace,
        config: SegmentConfig,
        keyframes: Arc<dyn KeyframeSource>,
        embedder: Arc<dyn FrameEmbedder>,
    ) -> Self {
        Self {
            workspace,
            config,
            keyframes,
            embedder,
        }
    }
}

#[async_trait]
impl StageRunner for SegmentRunner {
    type Job = SegmentJob;
    type Error = PipelineError;

    fn stage(&self) -> Stage {
        Stage::Segment
    }

    fn cache_state(&self, job: &SegmentJob) -> CacheState {
        if self.workspace.clips_path(&job.video_id).exists() {
            CacheState::Full
        } else {
            CacheState::Miss
        }
    }

    fn clear_artifacts(&self, job: &SegmentJob) -> PipelineResult<()> {
        let path = self.workspace.clips_path(&job.video_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn result_path(&self, job: &SegmentJob) -> String {
        self.workspace
            .relative_locator(&self.workspace.clips_path(&job.video_id))
    }

    async fn run(
        &self,
        job: &SegmentJob,
        progress: &ProgressHandle,
    ) -> PipelineResult<String> {
        let source = self
            .workspace
            .resolve_video(&job.video_id)?
            .ok_or_else(|| {
                PipelineError::not_found(format!("no source video for '{}'", job.video_id))
            })?;

        progress.update(0.05, "sampling keyframes")?;
        let samples = self
            .keyframes
            .sample(&source, self.config.fps_keyframe)
            .await?;

        let total = samples.len();
        let mut embedded = Vec::with_capacity(total);
        for (index, sample) in samples.into_iter().enumerate() {
            let embedding = self.embedder.embed(&sample.frame);
            embedded.push(EmbeddedSample { sample, embedding });
            let fraction = (index + 1) as f64 / total as f64;
            progress.update(
                0.1 + 0.7 * fraction,
                format!("embedding {}/{}", index + 1, total),
            )?;
        }

        let result = segment_samples(
            &job.video_id,
            &embedded,
            &self.config,
            self.embedder.model_id(),
            |p| {
                let _ = progress.update(0.8 + 0.15 * p, "building clips");
            },
        );
        self.workspace.write_clips(&job.video_id, &result.clips)?;
        info!(
            video_id = %job.video_id,
            clips = result.clips.len(),
            discarded = result.discarded_segments,
            "segmented video"
        );
        Ok(self.result_path(job))
    }
}
