//! Clip metadata produced by the segmentation stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single segmented span of a source video.
///
/// Clips are immutable once written; their identity is `(video_id, clip_id)`
/// and `clip_id` is assigned contiguously from 0 within a video by the clip
/// builder. The embedding is the unnormalized mean of the member keyframe
/// embeddings; normalization is deferred to theme scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Source video identifier (file stem under the workspace videos dir)
    pub video_id: String,
    /// 0-based, gapless index within the video
    pub clip_id: u32,
    /// Start of the span in seconds
    pub t_start: f64,
    /// End of the span in seconds, strictly greater than `t_start`
    pub t_end: f64,
    /// Keyframe sampling rate the clip was built from
    pub fps_keyframe: f64,
    /// Unnormalized mean embedding over the member keyframes
    pub embedding: Vec<f32>,
    /// Identifier of the embedding model that produced the vectors
    pub embedding_model: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Record schema version
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl Clip {
    /// Duration of the clip in seconds.
    pub fn duration(&self) -> f64 {
        self.t_end - self.t_start
    }

    /// Identity key `(video_id, clip_id)`.
    pub fn identity(&self) -> (&str, u32) {
        (&self.video_id, self.clip_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_clip() -> Clip {
        Clip {
            video_id: "demo".to_string(),
            clip_id: 3,
            t_start: 12.0,
            t_end: 17.5,
            fps_keyframe: 1.0,
            embedding: vec![0.25, -0.5, 1.0],
            embedding_model: "mean-color::rgb".to_string(),
            created_at: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn clip_serde_roundtrip_preserves_every_field() {
        let clip = sample_clip();
        let json = serde_json::to_string(&clip).unwrap();
        let decoded: Clip = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, clip);
    }

    #[test]
    fn clip_version_defaults_when_missing() {
        let json = r#"{
            "video_id": "demo",
            "clip_id": 0,
            "t_start": 0.0,
            "t_end": 2.0,
            "fps_keyframe": 1.0,
            "embedding": [0.0],
            "embedding_model": "m",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let clip: Clip = serde_json::from_str(json).unwrap();
        assert_eq!(clip.version, 1);
    }

    #[test]
    fn clip_duration() {
        assert!((sample_clip().duration() - 5.5).abs() < 1e-9);
    }
}
