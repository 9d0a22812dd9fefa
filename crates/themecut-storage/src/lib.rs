//! Workspace layout and durable artifact storage.
//!
//! Every JSON document (clips, scores, EDLs, statuses, queue state) is
//! written atomically: a temp file in the target directory, then a rename.
//! Readers never observe torn records, including across process crashes.

pub mod artifacts;
pub mod error;
pub mod status;
pub mod workspace;

pub use artifacts::{
    atomic_write_json, read_json, read_json_opt, ScoreEntry, ScoresDocument, ScoresMeta,
};
pub use error::{StorageError, StorageResult};
pub use status::StatusStore;
pub use workspace::Workspace;
