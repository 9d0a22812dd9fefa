//! Live event broadcast.
//!
//! Delivery is best-effort over a bounded `tokio::sync::broadcast` channel:
//! events published with no live subscribers are dropped, and a lagging
//! subscriber observes a gap rather than unbounded buffering.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::warn;

use themecut_models::{JobStatus, PipelineEvent};

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Idle interval after which a subscription yields a keepalive.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<PipelineEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to all live subscribers. A send with no receivers is not an
    /// error; events are ephemeral.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe with an initial snapshot, delivered before any live event.
    pub fn subscribe(&self, snapshot: Vec<JobStatus>) -> Subscription {
        Subscription {
            initial: Some(PipelineEvent::snapshot(snapshot)),
            rx: self.tx.subscribe(),
            keepalive: KEEPALIVE_INTERVAL,
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's view of the event stream.
pub struct Subscription {
    initial: Option<PipelineEvent>,
    rx: broadcast::Receiver<PipelineEvent>,
    keepalive: Duration,
}

impl Subscription {
    /// Override the keepalive interval.
    pub fn with_keepalive(mut self, interval: Duration) -> Self {
        self.keepalive = interval;
        self
    }

    /// Next event: the snapshot first, then live events, with a `Keepalive`
    /// after the idle interval. `None` once the broadcaster is gone.
    pub async fn next(&mut self) -> Option<PipelineEvent> {
        if let Some(snapshot) = self.initial.take() {
            return Some(snapshot);
        }
        loop {
            match tokio::time::timeout(self.keepalive, self.rx.recv()).await {
                Err(_) => return Some(PipelineEvent::Keepalive),
                Ok(Ok(event)) => return Some(event),
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!(skipped, "event subscriber lagged, continuing past gap");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
            }
        }
    }
}
