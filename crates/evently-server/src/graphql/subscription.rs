//! Subscription resolvers. Attached only when subscriptions are enabled.

use async_graphql::{Context, Result, Subscription};
use evently_pubsub::topics;
use futures_util::Stream;
use tokio_stream::StreamExt;

use super::types::EventAddedPayload;
use super::GraphQLContext;
use crate::event_create::EventAddedMessage;

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Every event created after the subscription starts.
    async fn event_added(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = EventAddedPayload>> {
        let gql = ctx.data::<GraphQLContext>()?;
        let subscription = gql.pubsub.subscribe(topics::EVENT_ADDED).await?;

        Ok(subscription.into_stream().filter_map(|notification| {
            match notification.decode::<EventAddedMessage>() {
                Ok(message) => Some(EventAddedPayload(message.new_event)),
                Err(e) => {
                    tracing::error!(error = %e, "dropping malformed EVENT_ADDED notification");
                    None
                }
            }
        }))
    }
}
