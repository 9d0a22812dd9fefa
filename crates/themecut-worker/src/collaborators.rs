//! External collaborator traits.
//!
//! The pipeline consumes models and media tools through these narrow seams:
//! keyframe decoding, frame embedding, text-prototype encoding and final
//! export rendering. Production wiring lives in `ffmpeg`; tests plug in
//! deterministic fakes.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use themecut_media::{Frame, KeyframeSample};
use themecut_models::EdlSegment;

use crate::error::{PipelineError, PipelineResult};

/// Visual embedding model applied to sampled keyframes.
pub trait FrameEmbedder: Send + Sync {
    fn embed(&self, frame: &Frame) -> Vec<f32>;

    /// Stable model identifier recorded on every clip.
    fn model_id(&self) -> &str;
}

/// Keyframe decoder for a source video. Decoding can take minutes on real
/// input, so the seam is async and implementations must not block the
/// runtime.
#[async_trait]
pub trait KeyframeSource: Send + Sync {
    async fn sample(&self, path: &Path, fps: f64) -> PipelineResult<Vec<KeyframeSample>>;
}

/// Text encoder producing prototype embeddings aligned with the frame
/// embedding space. Expected to return unit-length vectors.
pub trait TextEncoder: Send + Sync {
    fn encode_texts(&self, texts: &[String]) -> PipelineResult<Vec<Vec<f32>>>;
}

/// Renders an EDL against a source video into the final artifact.
#[async_trait]
pub trait MediaExporter: Send + Sync {
    async fn export(
        &self,
        segments: &[EdlSegment],
        source: &Path,
        output: &Path,
    ) -> PipelineResult<()>;
}

/// The full collaborator set handed to `Pipeline::new`.
#[derive(Clone)]
pub struct Collaborators {
    pub keyframes: Arc<dyn KeyframeSource>,
    pub embedder: Arc<dyn FrameEmbedder>,
    pub text_encoder: Arc<dyn TextEncoder>,
    pub exporter: Arc<dyn MediaExporter>,
}

/// Model-free embedder: the mean RGB color of the frame, scaled to [0, 1].
///
/// Has no text alignment, so theme scoring falls back to zero scores for
/// clips carrying this model id.
#[derive(Debug, Default)]
pub struct MeanColorEmbedder;

pub const MEAN_COLOR_MODEL: &str = "mean-color-v1";

impl FrameEmbedder for MeanColorEmbedder {
    fn embed(&self, frame: &Frame) -> Vec<f32> {
        let pixels = frame.pixel_count();
        if pixels == 0 {
            return vec![0.0, 0.0, 0.0];
        }
        let mut sums = [0.0f64; 3];
        for (r, g, b) in frame.pixels() {
            sums[0] += r as f64;
            sums[1] += g as f64;
            sums[2] += b as f64;
        }
        sums.iter()
            .map(|s| (s / pixels as f64 / 255.0) as f32)
            .collect()
    }

    fn model_id(&self) -> &str {
        MEAN_COLOR_MODEL
    }
}

/// Deterministic stand-in text encoder: hashes each phrase into a fixed-dim
/// unit vector. Useful without a real model; scores are stable but carry no
/// semantics.
#[derive(Debug, Clone)]
pub struct HashingTextEncoder {
    dim: usize,
}

impl Default for HashingTextEncoder {
    fn default() -> Self {
        Self { dim: 3 }
    }
}

impl HashingTextEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl TextEncoder for HashingTextEncoder {
    fn encode_texts(&self, texts: &[String]) -> PipelineResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                let seed = fnv1a(text.as_bytes());
                let mut vector: Vec<f32> = (0..self.dim)
                    .map(|i| {
                        let mut h = seed ^ (i as u64 + 1).wrapping_mul(0x9E3779B97F4A7C15);
                        h ^= h >> 33;
                        h = h.wrapping_mul(0xFF51AFD7ED558CCD);
                        h ^= h >> 33;
                        // Spread into [-1, 1].
                        ((h >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32
                    })
                    .collect();
                let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm == 0.0 {
                    return Err(PipelineError::invalid_input(format!(
                        "cannot encode phrase: {text:?}"
                    )));
                }
                for v in &mut vector {
                    *v /= norm;
                }
                Ok(vector)
            })
            .collect()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
