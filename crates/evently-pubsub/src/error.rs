//! Error types for the pub/sub channel.

/// Errors that can occur when publishing or subscribing.
#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    /// The channel has been closed and accepts no more traffic.
    #[error("pubsub channel is closed")]
    Closed,

    /// The payload could not be converted to or from JSON.
    #[error("pubsub payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
