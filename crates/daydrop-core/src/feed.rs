use std::sync::Mutex;

use tracing::{debug, warn};

use daydrop_types::events::FeedEvent;

/// Outbound notification channel.
///
/// Publishing is fire-and-forget from the ledgers' point of view: an error
/// is logged by [`notify`] and never reaches the caller of the ledger
/// operation.
pub trait FeedSink: Send + Sync {
    fn publish(&self, event: FeedEvent) -> anyhow::Result<()>;
}

/// Sink that drops every event. Used where no dispatcher is wired up.
pub struct NullFeed;

impl FeedSink for NullFeed {
    fn publish(&self, _event: FeedEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Sink that keeps events in memory, for tests and local tooling.
#[derive(Default)]
pub struct RecordingFeed {
    events: Mutex<Vec<FeedEvent>>,
}

impl RecordingFeed {
    pub fn events(&self) -> Vec<FeedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl FeedSink for RecordingFeed {
    fn publish(&self, event: FeedEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|e| anyhow::anyhow!("Feed lock poisoned: {}", e))?
            .push(event);
        Ok(())
    }
}

/// Best-effort publish. Runs after the ledger transaction has committed.
pub(crate) fn notify(feed: &dyn FeedSink, event: FeedEvent) {
    let name = event.name();
    let recipient = event.recipient();
    match feed.publish(event) {
        Ok(()) => debug!(event = name, recipient, "Feed event published"),
        Err(e) => warn!(event = name, recipient, "Feed dispatch failed, ignoring: {}", e),
    }
}
