//! Shot boundary detection over embedded keyframe samples.

use tracing::debug;

use crate::config::SegmentConfig;
use crate::frame::EmbeddedSample;
use crate::histogram::ColorHistogram;

/// Partition samples into maximal half-open `[start, end)` shot runs.
///
/// A boundary sits before index `i` when either the cosine distance between
/// the adjacent embeddings or the Bhattacharyya distance between the adjacent
/// frame histograms exceeds its threshold. Empty input yields no runs.
pub fn detect_shots(samples: &[EmbeddedSample], config: &SegmentConfig) -> Vec<(usize, usize)> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut boundaries = vec![0usize];
    let mut prev_hist = ColorHistogram::from_frame(samples[0].frame());
    for idx in 1..samples.len() {
        let emb_dist = cosine_distance(&samples[idx - 1].embedding, &samples[idx].embedding);
        let hist = ColorHistogram::from_frame(samples[idx].frame());
        let hist_dist = prev_hist.bhattacharyya_distance(&hist);
        if emb_dist > config.cosine_threshold || hist_dist > config.histogram_threshold {
            debug!(idx, emb_dist, hist_dist, "shot boundary");
            boundaries.push(idx);
        }
        prev_hist = hist;
    }
    boundaries.push(samples.len());

    boundaries
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|(start, end)| end > start)
        .collect()
}

/// `max(0, 1 - cos_sim)`. A zero-magnitude vector yields 1.0, treating the
/// degenerate frame as a boundary.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let a_norm = l2_norm(a);
    let b_norm = l2_norm(b);
    if a_norm == 0.0 || b_norm == 0.0 {
        return 1.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum();
    (1.0 - dot / (a_norm * b_norm)).max(0.0)
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}
