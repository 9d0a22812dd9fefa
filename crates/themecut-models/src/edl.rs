//! Edit decision list segments produced by the sequencing stage.

use serde::{Deserialize, Serialize};

/// Reason label attached to segments produced by the hysteresis sequencer.
pub const REASON_THEME_SEQUENCE: &str = "theme_sequence";

/// One entry of an edit decision list: a source time range in the final cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdlSegment {
    /// Source video identifier
    pub video_id: String,
    /// Segment start in source-video seconds
    pub t_start: f64,
    /// Segment end in source-video seconds
    pub t_end: f64,
    /// Why the segment was produced (audit/visualization label)
    pub reason: String,
}

impl EdlSegment {
    /// Duration of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.t_end - self.t_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edl_segment_serde_roundtrip() {
        let segment = EdlSegment {
            video_id: "demo".to_string(),
            t_start: 1.0,
            t_end: 4.5,
            reason: REASON_THEME_SEQUENCE.to_string(),
        };
        let json = serde_json::to_string(&segment).unwrap();
        let decoded: EdlSegment = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, segment);
        assert!((decoded.duration() - 3.5).abs() < 1e-9);
    }
}
