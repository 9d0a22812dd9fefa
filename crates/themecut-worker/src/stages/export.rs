//! Export stage: render a theme's edit decision list into a single video.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use themecut_models::{EdlSegment, Stage};
use themecut_queue::{CacheState, ProgressHandle, StageJob, StageRunner};
use themecut_storage::{read_json, StorageError, Workspace};

use crate::collaborators::MediaExporter;
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportJob {
    pub theme: String,
    pub slug: String,
    /// Select which video's EDL to render when the theme covers several.
    #[serde(default)]
    pub video_id: Option<String>,
    /// Workspace-relative override for the EDL to render.
    #[serde(default)]
    pub edl_path: Option<String>,
    #[serde(default)]
    pub force: bool,
}

impl StageJob for ExportJob {
    fn key(&self) -> &str {
        &self.slug
    }

    fn force(&self) -> bool {
        self.force
    }
}

pub struct ExportRunner {
    workspace: Workspace,
    exporter: Arc<dyn MediaExporter>,
}

impl ExportRunner {
    pub fn new(workspace: Workspace, exporter: Arc<dyn MediaExporter>) -> Self {
        Self {
            workspace,
            exporter,
        }
    }

    /// Pick the EDL file for this job: an explicit override, a chosen
    /// video, or the single sequenced video under the theme.
    fn locate_edl(&self, job: &ExportJob) -> PipelineResult<PathBuf> {
        if let Some(rel) = &job.edl_path {
            return Ok(self.workspace.root().join(rel));
        }
        if let Some(video_id) = &job.video_id {
            return Ok(self.workspace.edl_path(&job.slug, video_id));
        }
        let theme_dir = self.workspace.edl_path(&job.slug, "");
        let theme_dir = theme_dir.parent().unwrap_or(&theme_dir);
        let mut candidates = Vec::new();
        if theme_dir.is_dir() {
            for entry in fs::read_dir(theme_dir)? {
                let entry = entry?;
                let edl = entry.path().join("edl.json");
                if edl.is_file() {
                    candidates.push(edl);
                }
            }
        }
        candidates.sort();
        match candidates.len() {
            0 => Err(PipelineError::not_found(format!(
                "no edit list for theme '{}', run the sequence stage first",
                job.theme
            ))),
            1 => Ok(candidates.remove(0)),
            n => Err(PipelineError::invalid_input(format!(
                "theme '{}' has {n} edit lists, pass a video id to pick one",
                job.theme
            ))),
        }
    }
}

#[async_trait]
impl StageRunner for ExportRunner {
    type Job = ExportJob;
    type Error = PipelineError;

    fn stage(&self) -> Stage {
        Stage::Export
    }

    fn cache_state(&self, job: &ExportJob) -> CacheState {
        if self.workspace.export_path(&job.slug).exists() {
            CacheState::Full
        } else {
            CacheState::Miss
        }
    }

    fn clear_artifacts(&self, job: &ExportJob) -> PipelineResult<()> {
        let path = self.workspace.export_path(&job.slug);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn result_path(&self, job: &ExportJob) -> String {
        self.workspace
            .relative_locator(&self.workspace.export_path(&job.slug))
    }

    async fn run(&self, job: &ExportJob, progress: &ProgressHandle) -> PipelineResult<String> {
        progress.update(0.05, "loading edit list")?;
        let edl_file = self.locate_edl(job)?;
        let segments: Vec<EdlSegment> = match read_json(&edl_file) {
            Ok(segments) => segments,
            Err(StorageError::NotFound { .. }) => {
                return Err(PipelineError::not_found(format!(
                    "edit list {} does not exist",
                    edl_file.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if segments.is_empty() {
            return Err(PipelineError::invalid_input(format!(
                "edit list for theme '{}' is empty, nothing to export",
                job.theme
            )));
        }

        let video_id = segments[0].video_id.clone();
        let source = self
            .workspace
            .resolve_video(&video_id)?
            .ok_or_else(|| PipelineError::not_found(format!("no source video for '{video_id}'")))?;

        progress.update(0.4, format!("exporting {video_id}"))?;
        let output = self.workspace.export_path(&job.slug);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        self.exporter.export(&segments, &source, &output).await?;

        info!(
            theme = %job.theme,
            slug = %job.slug,
            segments = segments.len(),
            output = %output.display(),
            "export complete"
        );
        Ok(self.result_path(job))
    }
}
