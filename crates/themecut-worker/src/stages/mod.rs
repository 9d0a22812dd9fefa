//! The four stage specializations of the generic queue.

pub mod export;
pub mod segment;
pub mod sequence;
pub mod theme;

pub use export::{ExportJob, ExportRunner};
pub use segment::{SegmentJob, SegmentRunner};
pub use sequence::{SequenceJob, SequenceRunner};
pub use theme::{ThemeJob, ThemeRunner};
