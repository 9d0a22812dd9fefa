//! Per-stage algorithm parameters.

use serde::{Deserialize, Serialize};

/// Segment stage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Keyframe sampling rate in frames per second.
    pub fps_keyframe: f64,
    /// Cosine distance above this marks a shot boundary.
    pub cosine_threshold: f64,
    /// Bhattacharyya histogram distance above this marks a shot boundary.
    pub histogram_threshold: f64,
    pub min_clip_seconds: f64,
    pub max_clip_seconds: f64,
    /// Accumulate consecutive shot regions until they reach the minimum.
    pub merge_short_segments: bool,
    /// Chop regions longer than the maximum into anchored chunks.
    pub split_long_segments: bool,
    /// Keep trailing chunks that fall short of the minimum after splitting.
    pub keep_last_short_segment: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            fps_keyframe: 1.0,
            cosine_threshold: 0.3,
            histogram_threshold: 0.45,
            min_clip_seconds: 2.0,
            max_clip_seconds: 6.0,
            merge_short_segments: true,
            split_long_segments: true,
            keep_last_short_segment: false,
        }
    }
}

/// Theme scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeMatchConfig {
    /// Minimum score for a clip to count as on-theme downstream.
    pub score_threshold: f64,
    /// Weight applied to the best negative-prototype match.
    pub negative_weight: f64,
}

impl Default for ThemeMatchConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.2,
            negative_weight: 0.8,
        }
    }
}

/// Hysteresis sequencing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// A score at or above this enters selection.
    pub threshold_upper: f64,
    /// While selecting, a score at or above this stays selected.
    /// `None` means same as the upper threshold (no hysteresis band).
    pub threshold_lower: Option<f64>,
    /// Merged segments shorter than this are dropped.
    pub min_clip_seconds: Option<f64>,
    /// Merged segments longer than this are truncated, start preserved.
    pub max_clip_seconds: Option<f64>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            threshold_upper: 0.2,
            threshold_lower: None,
            min_clip_seconds: None,
            max_clip_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_defaults() {
        let cfg = SegmentConfig::default();
        assert_eq!(cfg.fps_keyframe, 1.0);
        assert_eq!(cfg.cosine_threshold, 0.3);
        assert_eq!(cfg.histogram_threshold, 0.45);
        assert_eq!(cfg.min_clip_seconds, 2.0);
        assert_eq!(cfg.max_clip_seconds, 6.0);
        assert!(cfg.merge_short_segments);
        assert!(!cfg.keep_last_short_segment);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: SegmentConfig = serde_json::from_str(r#"{"fps_keyframe": 2.0}"#).unwrap();
        assert_eq!(cfg.fps_keyframe, 2.0);
        assert_eq!(cfg.max_clip_seconds, 6.0);
    }

    #[test]
    fn theme_match_defaults() {
        let cfg = ThemeMatchConfig::default();
        assert_eq!(cfg.score_threshold, 0.2);
        assert_eq!(cfg.negative_weight, 0.8);
    }
}
