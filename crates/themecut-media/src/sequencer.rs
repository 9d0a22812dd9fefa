//! Hysteresis clip selection and EDL assembly.

use std::collections::HashMap;

use tracing::debug;

use themecut_models::{Clip, EdlSegment, ThemeScore, REASON_THEME_SEQUENCE};

use crate::config::SequenceConfig;

/// Outcome of sequencing one video's clips.
#[derive(Debug, Clone)]
pub struct SequenceResult {
    /// Selected base clips, before merging.
    pub selected_clips: Vec<Clip>,
    /// Merged segments forming the cut.
    pub edl: Vec<EdlSegment>,
    pub total_selected: usize,
    pub total_clips: usize,
}

/// Dual-threshold clip selector.
///
/// A score at or above the upper threshold starts selection; while selecting,
/// a score at or above the lower threshold keeps it going. Anything else ends
/// the run. The lower threshold defaults to the upper one, which disables the
/// hysteresis band.
#[derive(Debug, Clone)]
pub struct Sequencer {
    threshold_upper: f64,
    threshold_lower: f64,
    min_clip_seconds: Option<f64>,
    max_clip_seconds: Option<f64>,
}

impl Sequencer {
    pub fn new(config: &SequenceConfig) -> Self {
        Self {
            threshold_upper: config.threshold_upper,
            threshold_lower: config.threshold_lower.unwrap_or(config.threshold_upper),
            min_clip_seconds: config.min_clip_seconds,
            max_clip_seconds: config.max_clip_seconds,
        }
    }

    /// Align scores with clips by `(video_id, clip_id)`, select with
    /// hysteresis in timeline order, then merge runs of consecutive clips
    /// into EDL segments.
    pub fn sequence(&self, clips: &[Clip], scores: &[ThemeScore]) -> SequenceResult {
        let score_map: HashMap<(&str, u32), f64> = scores
            .iter()
            .map(|s| ((s.video_id.as_str(), s.clip_id), s.score))
            .collect();

        let mut ordered: Vec<&Clip> = clips.iter().collect();
        ordered.sort_by(|a, b| a.identity().cmp(&b.identity()));

        let mut selected: Vec<Clip> = Vec::new();
        let mut selecting = false;
        for clip in ordered {
            let score = score_map
                .get(&clip.identity())
                .copied()
                .unwrap_or(f64::NEG_INFINITY);
            if score >= self.threshold_upper {
                selected.push(clip.clone());
                selecting = true;
            } else if selecting && score >= self.threshold_lower {
                selected.push(clip.clone());
            } else {
                selecting = false;
            }
        }

        let edl = self.merge_to_edl(&selected);
        debug!(
            selected = selected.len(),
            segments = edl.len(),
            total = clips.len(),
            "sequencing complete"
        );
        SequenceResult {
            total_selected: selected.len(),
            total_clips: clips.len(),
            selected_clips: selected,
            edl,
        }
    }

    /// Merge selected clips while they share a video and have strictly
    /// consecutive clip ids. At flush, segments shorter than the minimum are
    /// dropped and longer ones truncated to `t_start + max`.
    fn merge_to_edl(&self, clips: &[Clip]) -> Vec<EdlSegment> {
        let mut edl = Vec::new();
        let mut group: Vec<&Clip> = Vec::new();
        let mut prev: Option<(&str, u32)> = None;

        for clip in clips {
            let contiguous = prev
                .map(|(vid, id)| vid == clip.video_id && clip.clip_id == id + 1)
                .unwrap_or(false);
            if !group.is_empty() && contiguous {
                group.push(clip);
            } else {
                self.flush(&group, &mut edl);
                group = vec![clip];
            }
            prev = Some((clip.video_id.as_str(), clip.clip_id));
        }
        self.flush(&group, &mut edl);
        edl
    }

    fn flush(&self, group: &[&Clip], edl: &mut Vec<EdlSegment>) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            return;
        };
        let t_start = first.t_start;
        let mut t_end = last.t_end;
        if let Some(min) = self.min_clip_seconds {
            if t_end - t_start < min {
                return;
            }
        }
        if let Some(max) = self.max_clip_seconds {
            if t_end - t_start > max {
                t_end = t_start + max;
            }
        }
        edl.push(EdlSegment {
            video_id: first.video_id.clone(),
            t_start,
            t_end,
            reason: REASON_THEME_SEQUENCE.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use themecut_models::ThemeScore;

    fn clip(video_id: &str, clip_id: u32, t_start: f64, t_end: f64) -> Clip {
        Clip {
            video_id: video_id.to_string(),
            clip_id,
            t_start,
            t_end,
            fps_keyframe: 1.0,
            embedding: vec![1.0],
            embedding_model: "m".to_string(),
            created_at: Utc::now(),
            version: 1,
        }
    }

    fn score(video_id: &str, clip_id: u32, value: f64) -> ThemeScore {
        ThemeScore {
            clip_id,
            video_id: video_id.to_string(),
            theme: "t".to_string(),
            score: value,
            s_pos: value,
            s_neg: 0.0,
            embedding_model: "m".to_string(),
            created_at: Utc::now(),
            metadata: Default::default(),
        }
    }

    fn scenario_clips() -> Vec<Clip> {
        vec![
            clip("v1", 0, 0.0, 1.0),
            clip("v1", 1, 1.0, 2.0),
            clip("v1", 2, 2.0, 3.0),
            clip("v1", 3, 3.0, 4.0),
        ]
    }

    fn scenario_scores() -> Vec<ThemeScore> {
        vec![
            score("v1", 0, 0.5),
            score("v1", 1, 0.45),
            score("v1", 2, 0.1),
            score("v1", 3, 0.6),
        ]
    }

    #[test]
    fn hysteresis_selects_and_merges() {
        let sequencer = Sequencer::new(&SequenceConfig {
            threshold_upper: 0.4,
            threshold_lower: Some(0.3),
            min_clip_seconds: None,
            max_clip_seconds: None,
        });
        let result = sequencer.sequence(&scenario_clips(), &scenario_scores());
        assert_eq!(result.total_selected, 3);
        assert_eq!(result.total_clips, 4);
        assert_eq!(result.edl.len(), 2);
        assert_eq!((result.edl[0].t_start, result.edl[0].t_end), (0.0, 2.0));
        assert_eq!((result.edl[1].t_start, result.edl[1].t_end), (3.0, 4.0));
        assert_eq!(result.edl[0].reason, REASON_THEME_SEQUENCE);
    }

    #[test]
    fn min_duration_drops_short_segments() {
        let sequencer = Sequencer::new(&SequenceConfig {
            threshold_upper: 0.4,
            threshold_lower: Some(0.3),
            min_clip_seconds: Some(1.5),
            max_clip_seconds: None,
        });
        let result = sequencer.sequence(&scenario_clips(), &scenario_scores());
        assert_eq!(result.edl.len(), 1);
        assert_eq!((result.edl[0].t_start, result.edl[0].t_end), (0.0, 2.0));
    }

    #[test]
    fn max_duration_truncates_preserving_start() {
        let sequencer = Sequencer::new(&SequenceConfig {
            threshold_upper: 0.0,
            threshold_lower: None,
            min_clip_seconds: None,
            max_clip_seconds: Some(2.5),
        });
        let clips = scenario_clips();
        let scores: Vec<ThemeScore> = (0..4).map(|i| score("v1", i, 1.0)).collect();
        let result = sequencer.sequence(&clips, &scores);
        assert_eq!(result.edl.len(), 1);
        assert_eq!((result.edl[0].t_start, result.edl[0].t_end), (0.0, 2.5));
    }

    #[test]
    fn selection_never_resumes_below_upper() {
        // Once a score drops below lower, values in [lower, upper) must not
        // re-enter selection.
        let sequencer = Sequencer::new(&SequenceConfig {
            threshold_upper: 0.4,
            threshold_lower: Some(0.3),
            min_clip_seconds: None,
            max_clip_seconds: None,
        });
        let clips: Vec<Clip> = (0..4).map(|i| clip("v1", i, i as f64, i as f64 + 1.0)).collect();
        let scores = vec![
            score("v1", 0, 0.5),
            score("v1", 1, 0.1),
            score("v1", 2, 0.35),
            score("v1", 3, 0.35),
        ];
        let result = sequencer.sequence(&clips, &scores);
        assert_eq!(result.total_selected, 1);
        assert_eq!(result.selected_clips[0].clip_id, 0);
    }

    #[test]
    fn missing_scores_end_selection() {
        let sequencer = Sequencer::new(&SequenceConfig {
            threshold_upper: 0.4,
            threshold_lower: Some(0.3),
            min_clip_seconds: None,
            max_clip_seconds: None,
        });
        let clips = scenario_clips();
        let scores = vec![score("v1", 0, 0.5), score("v1", 1, 0.45)];
        let result = sequencer.sequence(&clips, &scores);
        assert_eq!(result.total_selected, 2);
    }

    #[test]
    fn clips_from_different_videos_never_merge() {
        let sequencer = Sequencer::new(&SequenceConfig {
            threshold_upper: 0.1,
            threshold_lower: None,
            min_clip_seconds: None,
            max_clip_seconds: None,
        });
        let clips = vec![clip("a", 0, 0.0, 1.0), clip("b", 1, 1.0, 2.0)];
        let scores = vec![score("a", 0, 1.0), score("b", 1, 1.0)];
        let result = sequencer.sequence(&clips, &scores);
        assert_eq!(result.edl.len(), 2);
    }
}
