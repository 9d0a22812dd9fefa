//! In-process job queues for the pipeline stages.
//!
//! Each stage owns one `StageQueue`: a FIFO of deduplicated jobs drained by
//! a single tokio worker task. Enqueue is synchronous and never waits on a
//! running job; completed work short-circuits through artifact-presence
//! caching. Pending and active jobs are persisted so a crash re-queues the
//! interrupted job on startup.

pub mod error;
pub mod events;
pub mod progress;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use events::{EventBroadcaster, Subscription, DEFAULT_EVENT_CAPACITY, KEEPALIVE_INTERVAL};
pub use progress::ProgressHandle;
pub use queue::{CacheState, StageJob, StageQueue, StageRunner, Submission};
