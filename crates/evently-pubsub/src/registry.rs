//! Topic registry and subscription handles.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::error::PubSubError;

/// Default per-topic buffer size.
pub const DEFAULT_CAPACITY: usize = 256;

/// A message delivered to subscribers of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// The topic the message was published to.
    pub topic: String,
    /// The published payload.
    pub payload: serde_json::Value,
    /// RFC 3339 timestamp of the publish call.
    pub published_at: String,
}

impl Notification {
    /// Deserializes the payload into a concrete type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PubSubError> {
        Ok(T::deserialize(&self.payload)?)
    }
}

#[derive(Default)]
struct Topics {
    senders: HashMap<String, broadcast::Sender<Notification>>,
    closed: bool,
}

/// Registry of named publish/subscribe topics.
///
/// Cloning is cheap and every clone shares the same topics. Topics are
/// created lazily by the first [`subscribe`](Self::subscribe) call.
#[derive(Clone)]
pub struct PubSub {
    capacity: usize,
    topics: Arc<RwLock<Topics>>,
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PubSub {
    /// Creates an open registry. `capacity` is the per-topic buffer size
    /// and is raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(RwLock::new(Topics::default())),
        }
    }

    /// Publishes `payload` to every current subscriber of `topic`.
    ///
    /// Returns the number of subscribers the message was delivered to.
    /// A topic without subscribers is not an error: the message is dropped
    /// and `Ok(0)` is returned.
    ///
    /// # Errors
    ///
    /// Returns `PubSubError::Closed` after [`close`](Self::close), or
    /// `PubSubError::Serialization` if the payload cannot be encoded.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<usize, PubSubError> {
        let payload = serde_json::to_value(payload)?;

        let topics = self.topics.read().await;
        if topics.closed {
            return Err(PubSubError::Closed);
        }

        let Some(sender) = topics.senders.get(topic) else {
            tracing::debug!(topic, "published to topic without subscribers");
            return Ok(0);
        };

        let notification = Notification {
            topic: topic.to_string(),
            payload,
            published_at: chrono::Utc::now().to_rfc3339(),
        };

        // send only fails when every receiver has been dropped.
        match sender.send(notification) {
            Ok(delivered) => {
                tracing::debug!(topic, delivered, "notification published");
                Ok(delivered)
            }
            Err(_) => {
                tracing::debug!(topic, "all subscribers have gone away");
                Ok(0)
            }
        }
    }

    /// Subscribes to `topic`, creating it if needed.
    ///
    /// Only messages published after this call are received.
    pub async fn subscribe(&self, topic: &str) -> Result<Subscription, PubSubError> {
        let mut topics = self.topics.write().await;
        if topics.closed {
            return Err(PubSubError::Closed);
        }

        let capacity = self.capacity;
        let receiver = topics
            .senders
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();

        Ok(Subscription {
            topic: topic.to_string(),
            receiver,
        })
    }

    /// Returns the number of live subscriptions on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .senders
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Closes the registry. Open subscriptions end once they have drained
    /// any buffered messages. Closing twice is a no-op.
    pub async fn close(&self) {
        let mut topics = self.topics.write().await;
        if topics.closed {
            return;
        }
        topics.closed = true;
        let count = topics.senders.len();
        topics.senders.clear();
        tracing::info!(topics = count, "pubsub channel closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub async fn is_closed(&self) -> bool {
        self.topics.read().await.closed
    }
}

/// A live subscription to one topic.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<Notification>,
}

impl Subscription {
    /// The subscribed topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next notification.
    ///
    /// Returns `None` once the registry has been closed. Messages missed
    /// because this subscriber lagged are skipped with a warning.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        topic = %self.topic,
                        skipped,
                        "subscriber lagged; notifications were dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns a buffered notification without waiting, if one is ready.
    pub fn try_recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        topic = %self.topic,
                        skipped,
                        "subscriber lagged; notifications were dropped"
                    );
                }
                Err(_) => return None,
            }
        }
    }

    /// Converts the subscription into a stream of notifications.
    pub fn into_stream(self) -> impl Stream<Item = Notification> + Send + 'static {
        let topic = self.topic;
        BroadcastStream::new(self.receiver).filter_map(move |result| match result {
            Ok(notification) => Some(notification),
            Err(lagged) => {
                tracing::warn!(
                    topic = %topic,
                    error = %lagged,
                    "subscription stream lagged; notifications were dropped"
                );
                None
            }
        })
    }
}
