//! In-process publish/subscribe channel for Evently.
//!
//! A [`PubSub`] is a registry of named topics. Publishers send a JSON
//! payload to a topic; every live [`Subscription`] on that topic receives
//! a copy. Delivery is fire-and-forget: messages are not persisted or
//! retried, and a subscriber that falls more than `capacity` messages
//! behind skips the backlog.
//!
//! The registry is created once at process start, shared by cloning, and
//! closed at shutdown with [`PubSub::close`]. After closing, publishing
//! and subscribing fail with [`PubSubError::Closed`] and every open
//! subscription ends.
//!
//! # Usage
//!
//! ```rust,ignore
//! use evently_pubsub::{topics, PubSub};
//!
//! let pubsub = PubSub::new(256);
//! let mut sub = pubsub.subscribe(topics::EVENT_ADDED).await?;
//! pubsub.publish(topics::EVENT_ADDED, &payload).await?;
//! let notification = sub.recv().await;
//! ```

mod error;
mod publisher;
mod registry;

pub use error::PubSubError;
pub use publisher::Publisher;
pub use registry::{Notification, PubSub, Subscription, DEFAULT_CAPACITY};

/// Process-wide topic names.
pub mod topics {
    /// Published after a new event record has been saved.
    pub const EVENT_ADDED: &str = "EVENT_ADDED";
}
