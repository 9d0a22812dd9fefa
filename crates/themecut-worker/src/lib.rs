//! Stage runners and the pipeline runtime.
//!
//! Wires the four stage queues to the storage workspace and the event
//! broadcaster. Media decoding, embedding models, text encoding and
//! export rendering enter through the collaborator traits, so the whole
//! pipeline is testable with in-memory fakes.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod pipeline;
pub mod stages;

pub use collaborators::{
    Collaborators, FrameEmbedder, HashingTextEncoder, KeyframeSource, MeanColorEmbedder,
    MediaExporter, TextEncoder,
};
pub use config::PipelineConfig;
pub use ffmpeg::{FfmpegExporter, FfmpegKeyframeSource};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, StageRequest};
