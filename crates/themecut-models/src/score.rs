//! Theme scores produced by the theme-match stage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alignment score between one clip and one theme.
///
/// Keyed by `(video_id, clip_id)` for alignment with [`crate::Clip`].
/// `score` combines the positive and negative prototype similarities:
/// `s_pos - negative_weight * s_neg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeScore {
    /// Clip index within the video
    pub clip_id: u32,
    /// Source video identifier
    pub video_id: String,
    /// Theme name the score was computed against
    pub theme: String,
    /// Combined score
    pub score: f64,
    /// Best positive-prototype similarity
    pub s_pos: f64,
    /// Best negative-prototype similarity (0 when no negatives)
    pub s_neg: f64,
    /// Embedding model the clip vectors came from
    pub embedding_model: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Free-form provenance metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ThemeScore {
    /// Identity key `(video_id, clip_id)`.
    pub fn identity(&self) -> (&str, u32) {
        (&self.video_id, self.clip_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_score_serde_roundtrip_preserves_every_field() {
        let score = ThemeScore {
            clip_id: 7,
            video_id: "demo".to_string(),
            theme: "sunset surfing".to_string(),
            score: 0.42,
            s_pos: 0.5,
            s_neg: 0.1,
            embedding_model: "mean-color::rgb".to_string(),
            created_at: Utc::now(),
            metadata: BTreeMap::from([("mode".to_string(), "prototype".to_string())]),
        };
        let json = serde_json::to_string(&score).unwrap();
        let decoded: ThemeScore = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, score);
    }

    #[test]
    fn theme_score_metadata_defaults_to_empty() {
        let json = r#"{
            "clip_id": 0,
            "video_id": "v",
            "theme": "t",
            "score": 0.0,
            "s_pos": 0.0,
            "s_neg": 0.0,
            "embedding_model": "m",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let score: ThemeScore = serde_json::from_str(json).unwrap();
        assert!(score.metadata.is_empty());
    }
}
