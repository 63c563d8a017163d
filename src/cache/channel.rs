//! Broadcast Channel Module
//!
//! Named publish/subscribe channels shared by every tab of an origin, built on
//! `tokio::sync::broadcast`. Messages are not persisted: only subscriptions
//! alive at send time receive them, and a tab never receives its own posts.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::cache::CrossTabMessage;

/// Default per-channel buffer before slow subscribers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Envelope {
    sender: Arc<str>,
    message: CrossTabMessage,
}

// == Broadcast Hub ==
/// Registry of named channels for one origin.
#[derive(Debug)]
pub struct BroadcastHub {
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Opens a new endpoint on the channel called `name`.
    ///
    /// Every call yields a distinct tab identity, even for the same name.
    pub fn open(&self, name: &str) -> TabChannel {
        let sender = {
            let mut channels = self.channels.lock();
            channels
                .entry(name.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .clone()
        };

        TabChannel {
            id: Arc::from(Uuid::new_v4().to_string()),
            name: name.to_string(),
            sender,
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

// == Tab Channel ==
/// One tab's endpoint on a named channel.
#[derive(Debug, Clone)]
pub struct TabChannel {
    id: Arc<str>,
    name: String,
    sender: broadcast::Sender<Envelope>,
}

impl TabChannel {
    /// Unique identity of this endpoint.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fire-and-forget publish to every other subscribed tab.
    pub fn post(&self, message: CrossTabMessage) {
        let envelope = Envelope {
            sender: self.id.clone(),
            message,
        };
        // An error only means nobody is listening right now.
        if let Ok(receivers) = self.sender.send(envelope) {
            trace!(channel = %self.name, receivers, "posted cross-tab message");
        }
    }

    /// Starts listening. Dropping the subscription removes the listener.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            own_id: self.id.clone(),
            include_own: false,
            receiver: self.sender.subscribe(),
        }
    }
}

// == Subscription ==
/// A live listener on a channel.
#[derive(Debug)]
pub struct Subscription {
    own_id: Arc<str>,
    include_own: bool,
    receiver: broadcast::Receiver<Envelope>,
}

impl Subscription {
    /// Also deliver messages posted by the subscribing tab itself.
    ///
    /// Used by callers inside one tab that wait on that tab's own refresh.
    pub fn including_own(mut self) -> Self {
        self.include_own = true;
        self
    }

    /// Waits for the next message posted by another tab.
    ///
    /// Returns `None` once the channel has no senders left.
    pub async fn recv(&mut self) -> Option<CrossTabMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if !self.include_own && envelope.sender == self.own_id => {
                    continue
                }
                Ok(envelope) => return Some(envelope.message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "cross-tab subscriber lagged, messages dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_message_reaches_other_tab() {
        let hub = BroadcastHub::new();
        let tab_a = hub.open("greed_cache_channel");
        let tab_b = hub.open("greed_cache_channel");

        let mut sub = tab_b.subscribe();
        tab_a.post(CrossTabMessage::invalidated("commands"));

        assert_eq!(
            sub.recv().await,
            Some(CrossTabMessage::invalidated("commands"))
        );
    }

    #[tokio::test]
    async fn test_sender_does_not_receive_own_message() {
        let hub = BroadcastHub::new();
        let tab_a = hub.open("c");
        let tab_b = hub.open("c");

        let mut sub = tab_a.subscribe();
        tab_a.post(CrossTabMessage::invalidated("mine"));
        tab_b.post(CrossTabMessage::invalidated("theirs"));

        assert_eq!(sub.recv().await, Some(CrossTabMessage::invalidated("theirs")));
    }

    #[tokio::test]
    async fn test_channels_are_isolated_by_name() {
        let hub = BroadcastHub::new();
        let tab_a = hub.open("one");
        let tab_b = hub.open("two");
        let tab_c = hub.open("two");

        let mut sub = tab_b.subscribe();
        tab_a.post(CrossTabMessage::invalidated("from-one"));
        tab_c.post(CrossTabMessage::invalidated("from-two"));

        assert_eq!(sub.recv().await.unwrap().key(), "from-two");
    }

    #[tokio::test]
    async fn test_including_own_delivers_own_posts() {
        let hub = BroadcastHub::new();
        let tab = hub.open("c");

        let mut sub = tab.subscribe().including_own();
        tab.post(CrossTabMessage::invalidated("mine"));

        assert_eq!(sub.recv().await, Some(CrossTabMessage::invalidated("mine")));
    }

    #[test]
    fn test_post_without_listeners_is_silent() {
        let hub = BroadcastHub::new();
        let tab = hub.open("empty");
        tab.post(CrossTabMessage::invalidated("nobody"));
    }

    #[test]
    fn test_tab_ids_are_unique() {
        let hub = BroadcastHub::new();
        assert_ne!(hub.open("c").id(), hub.open("c").id());
    }
}
