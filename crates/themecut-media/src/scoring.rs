//! Theme scoring math.
//!
//! Clips are scored against text prototype embeddings produced by an
//! external encoder. The clip's mean embedding is L2-normalized, then
//! `score = s_pos - negative_weight * s_neg` where `s_pos`/`s_neg` are the
//! best dot products against the positive/negative prototype sets.

use chrono::Utc;
use tracing::{debug, info};

use themecut_models::{Clip, ThemeScore};

use crate::config::ThemeMatchConfig;
use crate::error::MediaError;

/// Encoded theme prototypes, one embedding per prototype phrase.
/// Embeddings are expected unit-length from the encoder.
#[derive(Debug, Clone, Default)]
pub struct PrototypeEmbeddings {
    pub positives: Vec<Vec<f32>>,
    pub negatives: Vec<Vec<f32>>,
}

impl PrototypeEmbeddings {
    pub fn is_empty(&self) -> bool {
        self.positives.is_empty() && self.negatives.is_empty()
    }
}

/// Score clips against prototypes, sorted by score descending.
///
/// Fails when the prototype sets are both empty or when the clips were
/// produced by more than one embedding model.
pub fn score_clips(
    clips: &[Clip],
    theme: &str,
    prototypes: &PrototypeEmbeddings,
    config: &ThemeMatchConfig,
) -> Result<Vec<ThemeScore>, MediaError> {
    if clips.is_empty() {
        return Ok(Vec::new());
    }
    if prototypes.is_empty() {
        return Err(MediaError::empty_input(
            "theme query needs at least one positive or negative prototype",
        ));
    }

    let embedding_model = &clips[0].embedding_model;
    if let Some(other) = clips
        .iter()
        .find(|c| &c.embedding_model != embedding_model)
    {
        return Err(MediaError::MixedEmbeddingModels(format!(
            "{} vs {}",
            embedding_model, other.embedding_model
        )));
    }

    info!(theme, clips = clips.len(), "scoring clips");
    let now = Utc::now();
    let mut results: Vec<ThemeScore> = clips
        .iter()
        .map(|clip| {
            let clip_vec = normalize(&clip.embedding);
            let s_pos = max_dot(&prototypes.positives, &clip_vec);
            let s_neg = max_dot(&prototypes.negatives, &clip_vec);
            let score = s_pos - config.negative_weight * s_neg;
            ThemeScore {
                clip_id: clip.clip_id,
                video_id: clip.video_id.clone(),
                theme: theme.to_string(),
                score,
                s_pos,
                s_neg,
                embedding_model: embedding_model.clone(),
                created_at: now,
                metadata: [("mode".to_string(), "prototype".to_string())].into(),
            }
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    if let Some(best) = results.first() {
        debug!(theme, best = best.score, "scoring finished");
    }
    Ok(results)
}

fn normalize(v: &[f32]) -> Vec<f64> {
    let values: Vec<f64> = v.iter().map(|x| *x as f64).collect();
    let norm = values.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return values;
    }
    values.iter().map(|x| x / norm).collect()
}

/// Best dot product against a prototype set, 0.0 for an empty set.
fn max_dot(prototypes: &[Vec<f32>], clip_vec: &[f64]) -> f64 {
    prototypes
        .iter()
        .map(|proto| {
            proto
                .iter()
                .zip(clip_vec)
                .map(|(p, c)| *p as f64 * c)
                .sum::<f64>()
        })
        .reduce(f64::max)
        .unwrap_or(0.0)
}
