//! Clip construction from shot regions.
//!
//! Regions come from the shot detector as half-open sample index runs. Short
//! runs are merged forward until they reach `min_clip_seconds`, long runs are
//! chopped into chunks anchored at the chunk's first timestamp, and each
//! surviving chunk becomes one `Clip` with the unnormalized mean embedding of
//! its samples.

use chrono::Utc;
use tracing::debug;

use themecut_models::Clip;

use crate::config::SegmentConfig;
use crate::frame::EmbeddedSample;
use crate::shot_detector::detect_shots;

/// Outcome of segmenting one video.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub clips: Vec<Clip>,
    pub discarded_segments: usize,
}

/// Detector plus builder in one call, with coarse progress checkpoints.
/// Per-sample progress belongs to the embedding loop upstream.
pub fn segment_samples(
    video_id: &str,
    samples: &[EmbeddedSample],
    config: &SegmentConfig,
    embedding_model: &str,
    mut progress: impl FnMut(f64),
) -> SegmentResult {
    if samples.is_empty() {
        progress(1.0);
        return SegmentResult {
            clips: Vec::new(),
            discarded_segments: 0,
        };
    }

    let regions = detect_shots(samples, config);
    progress(0.5);
    let clips = build_clips(video_id, samples, &regions, config, embedding_model);
    let discarded = regions.len().saturating_sub(clips.len());
    progress(1.0);
    debug!(
        video_id,
        clips = clips.len(),
        discarded,
        "segmentation complete"
    );
    SegmentResult {
        clips,
        discarded_segments: discarded,
    }
}

/// Build clips from samples and shot regions. Clip ids are contiguous from 0.
pub fn build_clips(
    video_id: &str,
    samples: &[EmbeddedSample],
    regions: &[(usize, usize)],
    config: &SegmentConfig,
    embedding_model: &str,
) -> Vec<Clip> {
    if samples.is_empty() {
        return Vec::new();
    }
    let regions = merge_short_regions(samples, regions, config);

    let mut clips = Vec::new();
    let mut clip_id = 0u32;
    for (start, end) in regions {
        let subset = &samples[start..end];
        if subset.is_empty() {
            continue;
        }
        for chunk in split_subset(subset, config) {
            if chunk.is_empty() {
                continue;
            }
            if duration(chunk) < config.min_clip_seconds && !config.keep_last_short_segment {
                continue;
            }
            clips.push(create_clip(video_id, clip_id, chunk, config, embedding_model));
            clip_id += 1;
        }
    }
    clips
}

/// Span between the first and last sample timestamps. A single sample has
/// zero duration.
fn duration(subset: &[EmbeddedSample]) -> f64 {
    match (subset.first(), subset.last()) {
        (Some(first), Some(last)) if subset.len() > 1 => {
            (last.timestamp() - first.timestamp()).max(0.0)
        }
        _ => 0.0,
    }
}

fn merge_short_regions(
    samples: &[EmbeddedSample],
    regions: &[(usize, usize)],
    config: &SegmentConfig,
) -> Vec<(usize, usize)> {
    if !config.merge_short_segments {
        return regions.to_vec();
    }
    let mut merged = Vec::new();
    let mut i = 0;
    while i < regions.len() {
        let start = regions[i].0;
        let mut end = regions[i].1;
        while duration(&samples[start..end]) < config.min_clip_seconds && i + 1 < regions.len() {
            i += 1;
            end = regions[i].1;
        }
        merged.push((start, end));
        i += 1;
    }
    merged
}

/// Chop a run longer than `max_clip_seconds` into chunks anchored at each
/// chunk's first sample timestamp. The last chunk may be shorter.
fn split_subset<'a>(
    subset: &'a [EmbeddedSample],
    config: &SegmentConfig,
) -> Vec<&'a [EmbeddedSample]> {
    if !config.split_long_segments || duration(subset) <= config.max_clip_seconds {
        return vec![subset];
    }

    let mut chunks = Vec::new();
    let mut chunk_start_idx = 0usize;
    let mut chunk_start_ts = subset[0].timestamp();
    for (idx, sample) in subset.iter().enumerate() {
        if idx == chunk_start_idx {
            chunk_start_ts = sample.timestamp();
            continue;
        }
        if sample.timestamp() - chunk_start_ts > config.max_clip_seconds {
            chunks.push(&subset[chunk_start_idx..idx]);
            chunk_start_idx = idx;
            chunk_start_ts = sample.timestamp();
        }
    }
    chunks.push(&subset[chunk_start_idx..]);
    chunks
}

fn create_clip(
    video_id: &str,
    clip_id: u32,
    chunk: &[EmbeddedSample],
    config: &SegmentConfig,
    embedding_model: &str,
) -> Clip {
    let dim = chunk[0].embedding.len();
    let mut embedding = vec![0.0f32; dim];
    for sample in chunk {
        for (acc, v) in embedding.iter_mut().zip(&sample.embedding) {
            *acc += v;
        }
    }
    let count = chunk.len() as f32;
    for v in &mut embedding {
        *v /= count;
    }

    let t_start = chunk[0].timestamp();
    let actual_end = chunk[chunk.len() - 1].timestamp();
    let mut t_end = if config.split_long_segments {
        actual_end.min(t_start + config.max_clip_seconds)
    } else {
        actual_end
    };

    // A single-sample chunk collapses to t_end == t_start. Fall back to one
    // sampling interval so the clip keeps a nonzero duration.
    if t_end <= t_start {
        let interval = if config.fps_keyframe > 0.0 {
            1.0 / config.fps_keyframe
        } else {
            1.0
        };
        let mut fallback = t_start + interval;
        if config.split_long_segments {
            fallback = fallback.min(t_start + config.max_clip_seconds);
        }
        t_end = fallback;
    }

    Clip {
        video_id: video_id.to_string(),
        clip_id,
        t_start,
        t_end,
        fps_keyframe: config.fps_keyframe,
        embedding,
        embedding_model: embedding_model.to_string(),
        created_at: Utc::now(),
        version: 1,
    }
}
