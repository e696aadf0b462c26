//! The publishing side of the channel as a trait.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PubSubError;
use crate::registry::PubSub;

/// Something that can announce a payload on a named topic.
///
/// Writers depend on this rather than on [`PubSub`] directly, so the
/// channel they announce on is always passed in explicitly.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `payload` on `topic` and returns the number of
    /// subscribers it reached.
    async fn publish<T>(&self, topic: &str, payload: &T) -> Result<usize, PubSubError>
    where
        T: Serialize + Sync + ?Sized;
}

#[async_trait]
impl Publisher for PubSub {
    async fn publish<T>(&self, topic: &str, payload: &T) -> Result<usize, PubSubError>
    where
        T: Serialize + Sync + ?Sized,
    {
        PubSub::publish(self, topic, payload).await
    }
}
