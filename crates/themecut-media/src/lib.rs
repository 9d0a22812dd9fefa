//! Pure pipeline algorithms for Themecut.
//!
//! Everything here is deterministic and side-effect free: shot boundary
//! detection over embedded keyframe samples, clip construction, theme
//! scoring math and hysteresis sequencing. Media decoding and model
//! inference live behind collaborator traits in `themecut-worker`.

pub mod clip_builder;
pub mod config;
pub mod error;
pub mod frame;
pub mod histogram;
pub mod scoring;
pub mod sequencer;
pub mod shot_detector;

pub use clip_builder::{build_clips, segment_samples, SegmentResult};
pub use config::{SegmentConfig, SequenceConfig, ThemeMatchConfig};
pub use error::MediaError;
pub use frame::{EmbeddedSample, Frame, KeyframeSample};
pub use histogram::ColorHistogram;
pub use scoring::{score_clips, PrototypeEmbeddings};
pub use sequencer::{SequenceResult, Sequencer};
pub use shot_detector::detect_shots;
