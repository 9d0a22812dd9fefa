//! Shared data models for the Themecut pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Clips, theme scores and EDL segments (the pipeline artifacts)
//! - Theme queries and prototype phrases
//! - Job status records and live pipeline events
//! - Theme slug derivation

pub mod clip;
pub mod edl;
pub mod event;
pub mod job;
pub mod score;
pub mod slug;
pub mod theme;

// Re-export common types
pub use clip::Clip;
pub use edl::{EdlSegment, REASON_THEME_SEQUENCE};
pub use event::PipelineEvent;
pub use job::{JobState, JobStatus, Stage};
pub use score::ThemeScore;
pub use slug::slugify;
pub use theme::{ThemePrototype, ThemeQuery};
