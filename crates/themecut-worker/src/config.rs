//! Runtime configuration.

use std::path::PathBuf;

use themecut_media::{SegmentConfig, SequenceConfig, ThemeMatchConfig};
use themecut_queue::DEFAULT_EVENT_CAPACITY;

/// Aggregated pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workspace_root: PathBuf,
    pub segment: SegmentConfig,
    pub theme_match: ThemeMatchConfig,
    pub sequence: SequenceConfig,
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("./workspace"),
            segment: SegmentConfig::default(),
            theme_match: ThemeMatchConfig::default(),
            sequence: SequenceConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            workspace_root: std::env::var("THEMECUT_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./workspace")),
            ..Self::default()
        };
        if let Some(fps) = env_parse("THEMECUT_SEGMENT_FPS") {
            config.segment.fps_keyframe = fps;
        }
        if let Some(threshold) = env_parse("THEMECUT_SCORE_THRESHOLD") {
            config.theme_match.score_threshold = threshold;
            config.sequence.threshold_upper = threshold;
        }
        if let Some(capacity) = env_parse("THEMECUT_EVENT_CAPACITY") {
            config.event_capacity = capacity;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
