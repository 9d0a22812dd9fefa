//! Atomic JSON documents and the typed artifact readers/writers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use themecut_models::{Clip, EdlSegment};

use crate::error::{StorageError, StorageResult};
use crate::workspace::Workspace;

/// Write a JSON document atomically: temp file in the target directory, then
/// rename over the destination.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::invalid_path(path.display().to_string()))?;
    fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file(), value)?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

/// Read a JSON document, failing with `NotFound` when the file is missing.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    match read_json_opt(path)? {
        Some(value) => Ok(value),
        None => Err(StorageError::not_found(path.display().to_string())),
    }
}

/// Read a JSON document, mapping a missing file to `None`.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&raw)?))
}

/// Scores document metadata, recorded next to the per-video entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoresMeta {
    pub theme: String,
    pub theme_slug: String,
    pub created_at: DateTime<Utc>,
    pub positives: Vec<String>,
    pub negatives: Vec<String>,
    pub embedding_model: String,
}

/// One scored clip inside a scores document, ordered by `t_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub clip_id: u32,
    pub score: f64,
    pub s_pos: f64,
    pub s_neg: f64,
    pub t_start: f64,
    pub t_end: f64,
}

/// `themes/{slug}/scores.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoresDocument {
    pub meta: ScoresMeta,
    pub scores: BTreeMap<String, Vec<ScoreEntry>>,
}

impl ScoresDocument {
    /// Video ids with at least one entry, sorted.
    pub fn video_ids(&self) -> Vec<String> {
        self.scores
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(video_id, _)| video_id.clone())
            .collect()
    }
}

impl Workspace {
    pub fn write_clips(&self, video_id: &str, clips: &[Clip]) -> StorageResult<()> {
        atomic_write_json(&self.clips_path(video_id), &clips)
    }

    /// Clips for one video. `None` when the video was never segmented;
    /// malformed documents are treated the same way, with a warning.
    pub fn read_clips(&self, video_id: &str) -> StorageResult<Option<Vec<Clip>>> {
        let path = self.clips_path(video_id);
        match read_json_opt(&path) {
            Ok(clips) => Ok(clips),
            Err(StorageError::Json(e)) => {
                warn!(video_id, error = %e, "skipping malformed clips document");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn write_scores(&self, theme_slug: &str, doc: &ScoresDocument) -> StorageResult<()> {
        atomic_write_json(&self.scores_path(theme_slug), doc)
    }

    pub fn read_scores(&self, theme_slug: &str) -> StorageResult<Option<ScoresDocument>> {
        read_json_opt(&self.scores_path(theme_slug))
    }

    pub fn write_edl(
        &self,
        theme_slug: &str,
        video_id: &str,
        segments: &[EdlSegment],
    ) -> StorageResult<()> {
        atomic_write_json(&self.edl_path(theme_slug, video_id), &segments)
    }

    pub fn read_edl(
        &self,
        theme_slug: &str,
        video_id: &str,
    ) -> StorageResult<Option<Vec<EdlSegment>>> {
        read_json_opt(&self.edl_path(theme_slug, video_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn clip(video_id: &str, clip_id: u32) -> Clip {
        Clip {
            video_id: video_id.to_string(),
            clip_id,
            t_start: 0.0,
            t_end: 2.0,
            fps_keyframe: 1.0,
            embedding: vec![0.5, 0.5],
            embedding_model: "m".to_string(),
            created_at: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a/b/doc.json");
        atomic_write_json(&path, &vec![1, 2, 3]).unwrap();
        let back: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.json");
        let value: Option<Vec<i32>> = read_json_opt(&path).unwrap();
        assert!(value.is_none());
        assert!(matches!(
            read_json::<Vec<i32>>(&path),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn clips_round_trip_through_workspace() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::new(tmp.path());
        let clips = vec![clip("v1", 0), clip("v1", 1)];
        ws.write_clips("v1", &clips).unwrap();
        let back = ws.read_clips("v1").unwrap().unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].clip_id, 1);
    }

    #[test]
    fn malformed_clips_read_as_none() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::new(tmp.path());
        let path = ws.clips_path("v1");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(ws.read_clips("v1").unwrap().is_none());
    }

    #[test]
    fn scores_document_lists_videos_with_entries() {
        let doc = ScoresDocument {
            meta: ScoresMeta {
                theme: "Sunset".into(),
                theme_slug: "sunset".into(),
                created_at: Utc::now(),
                positives: vec!["sunset".into()],
                negatives: vec![],
                embedding_model: "m".into(),
            },
            scores: [
                (
                    "v1".to_string(),
                    vec![ScoreEntry {
                        clip_id: 0,
                        score: 0.4,
                        s_pos: 0.4,
                        s_neg: 0.0,
                        t_start: 0.0,
                        t_end: 2.0,
                    }],
                ),
                ("v2".to_string(), vec![]),
            ]
            .into(),
        };
        assert_eq!(doc.video_ids(), vec!["v1"]);
    }
}
