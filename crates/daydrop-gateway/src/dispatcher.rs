use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use daydrop_core::FeedSink;
use daydrop_types::events::FeedEvent;
use daydrop_types::models::DbId;

/// Routes feed events to the subscriber registered for their recipient.
///
/// One subscriber per user; a newer registration replaces an older one.
/// Whatever carries events to clients holds the receiver half.
/// Registration and publishing are synchronous so the ledgers can publish
/// from blocking threads.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<DbId, (Uuid, mpsc::UnboundedSender<FeedEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-user channel. Returns (conn_id, receiver).
    pub fn register_user_channel(&self, user_id: DbId) -> (Uuid, mpsc::UnboundedReceiver<FeedEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut channels) = self.inner.user_channels.write() {
            channels.insert(user_id, (conn_id, tx));
        }
        (conn_id, rx)
    }

    /// Unregister a per-user channel, but only if conn_id matches.
    pub fn unregister_user_channel(&self, user_id: DbId, conn_id: Uuid) {
        if let Ok(mut channels) = self.inner.user_channels.write() {
            if channels.get(&user_id).is_some_and(|(stored, _)| *stored == conn_id) {
                channels.remove(&user_id);
            }
        }
    }

    pub fn is_connected(&self, user_id: DbId) -> bool {
        self.inner
            .user_channels
            .read()
            .map(|channels| channels.contains_key(&user_id))
            .unwrap_or(false)
    }

    pub fn connected_count(&self) -> usize {
        self.inner.user_channels.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl FeedSink for Dispatcher {
    /// An offline recipient is not an error; a channel whose receiver went
    /// away is, and the stale entry is dropped.
    fn publish(&self, event: FeedEvent) -> anyhow::Result<()> {
        let recipient = event.recipient();
        let channels = self
            .inner
            .user_channels
            .read()
            .map_err(|e| anyhow!("Dispatcher lock poisoned: {}", e))?;

        let Some((conn_id, tx)) = channels.get(&recipient) else {
            trace!(recipient, "Recipient offline, dropping {}", event.name());
            return Ok(());
        };

        if tx.send(event).is_err() {
            let conn_id = *conn_id;
            drop(channels);
            self.unregister_user_channel(recipient, conn_id);
            return Err(anyhow!("Feed channel for user {} is closed", recipient));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(follower_id: DbId) -> FeedEvent {
        FeedEvent::FollowAccepted {
            follow_id: 1,
            follower_id,
            followed_id: 99,
        }
    }

    #[test]
    fn delivers_only_to_the_recipient() {
        let dispatcher = Dispatcher::new();
        let (_, mut alice) = dispatcher.register_user_channel(1);
        let (_, mut bob) = dispatcher.register_user_channel(2);

        dispatcher.publish(accepted(1)).unwrap();

        assert_eq!(alice.try_recv().unwrap(), accepted(1));
        assert!(bob.try_recv().is_err());
    }

    #[test]
    fn offline_recipient_is_not_an_error() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.publish(accepted(5)).is_ok());
    }

    #[test]
    fn closed_channel_is_reported_and_pruned() {
        let dispatcher = Dispatcher::new();
        let (_, rx) = dispatcher.register_user_channel(1);
        std::mem::drop(rx);

        assert!(dispatcher.publish(accepted(1)).is_err());
        assert!(!dispatcher.is_connected(1));
    }

    #[test]
    fn stale_connection_cannot_unregister_newer_one() {
        let dispatcher = Dispatcher::new();
        let (old_conn, _old_rx) = dispatcher.register_user_channel(1);
        let (new_conn, _new_rx) = dispatcher.register_user_channel(1);

        dispatcher.unregister_user_channel(1, old_conn);
        assert!(dispatcher.is_connected(1));

        dispatcher.unregister_user_channel(1, new_conn);
        assert_eq!(dispatcher.connected_count(), 0);
    }
}
