//! Realtime change feed for inserted location reports.
//!
//! One tokio broadcast channel per session topic. Channels are created on first
//! subscription and dropped once a publish finds no remaining receivers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::store::{LocationFeed, StoreError};
use crate::models::{LocationReport, NewLocationReport};

/// Table name carried in change events.
pub const LOCATIONS_TABLE: &str = "locations";

/// Default per-topic channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Kind of row change. Only inserts are ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
}

/// A row change delivered to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event: ChangeKind,
    pub table: String,
    pub new: LocationReport,
}

impl ChangeEvent {
    pub fn insert(report: LocationReport) -> Self {
        Self {
            event: ChangeKind::Insert,
            table: LOCATIONS_TABLE.to_string(),
            new: report,
        }
    }
}

/// Topic name for the inserts of one session.
pub fn topic_for(session_id: Uuid) -> String {
    format!("{}:{}", LOCATIONS_TABLE, session_id)
}

/// Fan-out hub keyed by session topic.
#[derive(Clone)]
pub struct ChangeFeed {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<ChangeEvent>>>>,
    capacity: usize,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to inserts for `session_id`, creating the topic if needed.
    pub async fn subscribe(&self, session_id: Uuid) -> Subscription {
        let topic = topic_for(session_id);
        let mut topics = self.topics.write().await;
        let receiver = topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(topic = %topic, "Live subscription registered");
        Subscription { topic, receiver }
    }

    /// Subscribe unless the session already has `limit` subscribers.
    ///
    /// The count and the registration happen under one lock, so concurrent callers
    /// cannot push a topic past the limit.
    pub async fn try_subscribe(&self, session_id: Uuid, limit: usize) -> Option<Subscription> {
        let topic = topic_for(session_id);
        let mut topics = self.topics.write().await;
        let sender = topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        if sender.receiver_count() >= limit {
            if sender.receiver_count() == 0 {
                topics.remove(&topic);
            }
            return None;
        }
        let receiver = sender.subscribe();
        debug!(topic = %topic, "Live subscription registered");
        Some(Subscription { topic, receiver })
    }

    /// Deliver an event to the subscribers of its session. Returns the receiver count.
    pub async fn publish(&self, event: ChangeEvent) -> usize {
        let topic = topic_for(event.new.session_id);
        let mut topics = self.topics.write().await;
        let Some(sender) = topics.get(&topic) else {
            return 0;
        };
        let delivered = sender.send(event).unwrap_or(0);
        if sender.receiver_count() == 0 {
            debug!(topic = %topic, "Removing topic with no subscribers");
            topics.remove(&topic);
        }
        delivered
    }

    /// Drop a subscription and prune its topic when it was the last one.
    pub async fn unsubscribe(&self, subscription: Subscription) {
        let topic = subscription.topic.clone();
        drop(subscription);
        let mut topics = self.topics.write().await;
        if topics
            .get(&topic)
            .map(|s| s.receiver_count() == 0)
            .unwrap_or(false)
        {
            topics.remove(&topic);
        }
        debug!(topic = %topic, "Live subscription removed");
    }

    /// Current number of live subscribers for a session.
    pub async fn subscriber_count(&self, session_id: Uuid) -> usize {
        self.topics
            .read()
            .await
            .get(&topic_for(session_id))
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

/// Receiving end of a live subscription.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next event. Returns `None` once the topic is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Live subscriber lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Live subscriber lagged, events skipped");
                }
                Err(_) => return None,
            }
        }
    }
}

/// A [`LocationFeed`] that publishes an insert event after every successful append.
pub struct LiveLocationFeed {
    inner: Arc<dyn LocationFeed>,
    changes: ChangeFeed,
}

impl LiveLocationFeed {
    pub fn new(inner: Arc<dyn LocationFeed>, changes: ChangeFeed) -> Self {
        Self { inner, changes }
    }

    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }
}

#[async_trait]
impl LocationFeed for LiveLocationFeed {
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError> {
        let stored = self.inner.append(report).await?;
        let delivered = self.changes.publish(ChangeEvent::insert(stored.clone())).await;
        debug!(
            session_id = %stored.session_id,
            subscribers = delivered,
            "Insert event published"
        );
        Ok(stored)
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<LocationReport>, StoreError> {
        self.inner.list_for_session(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSession;
    use crate::services::store::{InMemoryStore, SessionStore};
    use chrono::Utc;
    use tokio::time::{timeout, Duration};

    fn report(session_id: Uuid) -> LocationReport {
        LocationReport {
            id: Uuid::new_v4(),
            session_id,
            participant_name: Some("Ann".into()),
            latitude: 1.0,
            longitude: 2.0,
            accuracy: Some(3.0),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers_of_session() {
        let feed = ChangeFeed::default();
        let session_id = Uuid::new_v4();
        let mut a = feed.subscribe(session_id).await;
        let mut b = feed.subscribe(session_id).await;

        let delivered = feed.publish(ChangeEvent::insert(report(session_id))).await;
        assert_eq!(delivered, 2);

        let ea = timeout(Duration::from_millis(50), a.recv()).await.unwrap().unwrap();
        let eb = timeout(Duration::from_millis(50), b.recv()).await.unwrap().unwrap();
        assert_eq!(ea, eb);
        assert_eq!(ea.event, ChangeKind::Insert);
        assert_eq!(ea.table, "locations");
    }

    #[tokio::test]
    async fn test_publish_is_filtered_by_session() {
        let feed = ChangeFeed::default();
        let watched = Uuid::new_v4();
        let mut sub = feed.subscribe(watched).await;

        assert_eq!(feed.publish(ChangeEvent::insert(report(Uuid::new_v4()))).await, 0);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_topic_removed_after_publish_without_subscribers() {
        let feed = ChangeFeed::default();
        let session_id = Uuid::new_v4();
        {
            let _sub = feed.subscribe(session_id).await;
        }
        feed.publish(ChangeEvent::insert(report(session_id))).await;
        assert!(feed.topics.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_prunes_topic() {
        let feed = ChangeFeed::default();
        let session_id = Uuid::new_v4();
        let sub = feed.subscribe(session_id).await;
        assert_eq!(feed.subscriber_count(session_id).await, 1);
        feed.unsubscribe(sub).await;
        assert_eq!(feed.subscriber_count(session_id).await, 0);
        assert!(feed.topics.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_try_subscribe_respects_limit() {
        let feed = ChangeFeed::default();
        let session_id = Uuid::new_v4();
        let first = feed.try_subscribe(session_id, 1).await;
        assert!(first.is_some());
        assert!(feed.try_subscribe(session_id, 1).await.is_none());

        feed.unsubscribe(first.unwrap()).await;
        assert!(feed.try_subscribe(session_id, 1).await.is_some());
    }

    #[tokio::test]
    async fn test_try_subscribe_zero_limit_leaves_no_topic() {
        let feed = ChangeFeed::default();
        assert!(feed.try_subscribe(Uuid::new_v4(), 0).await.is_none());
        assert!(feed.topics.read().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_try_subscribe_never_exceeds_limit() {
        let feed = ChangeFeed::default();
        let session_id = Uuid::new_v4();

        let attempts: Vec<_> = (0..32)
            .map(|_| {
                let feed = feed.clone();
                tokio::spawn(async move { feed.try_subscribe(session_id, 5).await })
            })
            .collect();

        let mut held = Vec::new();
        for attempt in attempts {
            if let Some(sub) = attempt.await.unwrap() {
                held.push(sub);
            }
        }

        assert_eq!(held.len(), 5);
        assert_eq!(feed.subscriber_count(session_id).await, 5);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_to_latest() {
        let feed = ChangeFeed::new(2);
        let session_id = Uuid::new_v4();
        let mut sub = feed.subscribe(session_id).await;
        for _ in 0..5 {
            feed.publish(ChangeEvent::insert(report(session_id))).await;
        }
        let mut received = 0;
        while sub.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 2);
    }

    #[test]
    fn test_change_event_serialization() {
        let event = ChangeEvent::insert(report(Uuid::new_v4()));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"INSERT\""));
        assert!(json.contains("\"table\":\"locations\""));
        assert!(json.contains("\"new\":{"));
    }

    #[tokio::test]
    async fn test_live_feed_publishes_after_append() {
        let store = InMemoryStore::new();
        let session = store
            .insert_session(NewSession::new("Field Trip".into(), None, Utc::now()))
            .await
            .unwrap();
        let changes = ChangeFeed::default();
        let live = LiveLocationFeed::new(Arc::new(store.clone()), changes.clone());
        let mut sub = changes.subscribe(session.id).await;

        let stored = live
            .append(NewLocationReport {
                session_id: session.id,
                participant_name: Some("Ann".into()),
                latitude: 1.0,
                longitude: 2.0,
                accuracy: None,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        let event = sub.try_recv().unwrap();
        assert_eq!(event.new, stored);
    }

    #[tokio::test]
    async fn test_live_feed_does_not_publish_failed_append() {
        let store = InMemoryStore::new();
        let changes = ChangeFeed::default();
        let live = LiveLocationFeed::new(Arc::new(store), changes.clone());
        let session_id = Uuid::new_v4();
        let mut sub = changes.subscribe(session_id).await;

        let result = live
            .append(NewLocationReport {
                session_id,
                participant_name: None,
                latitude: 1.0,
                longitude: 2.0,
                accuracy: None,
                timestamp: Utc::now(),
            })
            .await;
        assert!(result.is_err());
        assert!(sub.try_recv().is_none());
    }
}
