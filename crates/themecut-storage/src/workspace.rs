//! Deterministic workspace layout.
//!
//! ```text
//! videos/                              source media, file stem = video_id
//! segmentation/{video_id}/clips.json
//! segmentation/{video_id}/status.json
//! segmentation/queue.json
//! themes/{slug}/scores.json
//! themes/{slug}/status.json
//! themes/queue.json
//! edl/{slug}/{video_id}/edl.json
//! edl/{slug}/status.json
//! edl/queue.json
//! exports/{slug}/output.mp4
//! exports/{slug}/status.json
//! exports/queue.json
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use themecut_models::Stage;

use crate::error::StorageResult;

pub const WORKSPACE_ENV_KEY: &str = "THEMECUT_WORKSPACE";
const DEFAULT_WORKSPACE: &str = "./workspace";

/// Root of the on-disk pipeline workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `THEMECUT_WORKSPACE`, falling back to `./workspace`.
    pub fn from_env() -> Self {
        let root = env::var(WORKSPACE_ENV_KEY).unwrap_or_else(|_| DEFAULT_WORKSPACE.to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    /// Top-level directory owned by a stage.
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        let name = match stage {
            Stage::Segment => "segmentation",
            Stage::ThemeMatch => "themes",
            Stage::Sequence => "edl",
            Stage::Export => "exports",
        };
        self.root.join(name)
    }

    pub fn clips_path(&self, video_id: &str) -> PathBuf {
        self.stage_dir(Stage::Segment).join(video_id).join("clips.json")
    }

    pub fn scores_path(&self, theme_slug: &str) -> PathBuf {
        self.stage_dir(Stage::ThemeMatch)
            .join(theme_slug)
            .join("scores.json")
    }

    pub fn edl_path(&self, theme_slug: &str, video_id: &str) -> PathBuf {
        self.stage_dir(Stage::Sequence)
            .join(theme_slug)
            .join(video_id)
            .join("edl.json")
    }

    pub fn export_path(&self, theme_slug: &str) -> PathBuf {
        self.stage_dir(Stage::Export)
            .join(theme_slug)
            .join("output.mp4")
    }

    /// Durable status record for one `(stage, key)` job.
    pub fn status_path(&self, stage: Stage, key: &str) -> PathBuf {
        self.stage_dir(stage).join(key).join("status.json")
    }

    /// Persisted pending/active document for a stage queue.
    pub fn queue_state_path(&self, stage: Stage) -> PathBuf {
        self.stage_dir(stage).join("queue.json")
    }

    /// Create the videos directory and the four stage directories.
    pub fn ensure_layout(&self) -> StorageResult<()> {
        fs::create_dir_all(self.videos_dir())?;
        for stage in Stage::ALL {
            fs::create_dir_all(self.stage_dir(stage))?;
        }
        Ok(())
    }

    /// Find a source file under `videos/` whose stem matches `video_id`.
    pub fn resolve_video(&self, video_id: &str) -> StorageResult<Option<PathBuf>> {
        let dir = self.videos_dir();
        if !dir.exists() {
            return Ok(None);
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.file_stem().and_then(|s| s.to_str()) == Some(video_id) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Video ids of all sources present under `videos/`, sorted.
    pub fn list_videos(&self) -> StorageResult<Vec<String>> {
        let dir = self.videos_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Video ids that have a clips document, sorted.
    pub fn list_segmented(&self) -> StorageResult<Vec<String>> {
        let dir = self.stage_dir(Stage::Segment);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() && path.join("clips.json").is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Workspace-relative locator with forward slashes, used in statuses and
    /// events. Falls back to the absolute path when outside the root.
    pub fn relative_locator(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_paths() {
        let ws = Workspace::new("/data/ws");
        assert_eq!(
            ws.clips_path("v1"),
            PathBuf::from("/data/ws/segmentation/v1/clips.json")
        );
        assert_eq!(
            ws.scores_path("sunset"),
            PathBuf::from("/data/ws/themes/sunset/scores.json")
        );
        assert_eq!(
            ws.edl_path("sunset", "v1"),
            PathBuf::from("/data/ws/edl/sunset/v1/edl.json")
        );
        assert_eq!(
            ws.export_path("sunset"),
            PathBuf::from("/data/ws/exports/sunset/output.mp4")
        );
        assert_eq!(
            ws.queue_state_path(Stage::Segment),
            PathBuf::from("/data/ws/segmentation/queue.json")
        );
    }

    #[test]
    fn ensure_layout_creates_stage_dirs() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::new(tmp.path());
        ws.ensure_layout().unwrap();
        assert!(ws.videos_dir().is_dir());
        for stage in Stage::ALL {
            assert!(ws.stage_dir(stage).is_dir());
        }
    }

    #[test]
    fn resolve_video_matches_by_stem() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::new(tmp.path());
        ws.ensure_layout().unwrap();
        std::fs::write(ws.videos_dir().join("clip_a.mp4"), b"x").unwrap();
        std::fs::write(ws.videos_dir().join("clip_b.mov"), b"x").unwrap();

        assert!(ws.resolve_video("clip_a").unwrap().is_some());
        assert!(ws.resolve_video("clip_b").unwrap().is_some());
        assert!(ws.resolve_video("missing").unwrap().is_none());
        assert_eq!(ws.list_videos().unwrap(), vec!["clip_a", "clip_b"]);
    }

    #[test]
    fn relative_locator_uses_forward_slashes() {
        let ws = Workspace::new("/data/ws");
        let loc = ws.relative_locator(&ws.clips_path("v1"));
        assert_eq!(loc, "segmentation/v1/clips.json");
    }
}
