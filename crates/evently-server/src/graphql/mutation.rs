//! Mutation resolvers.

use async_graphql::{Context, ErrorExtensions, MergedObject, Object, Result, ID};

use super::types::{EventCreateInput, EventCreatePayload};
use super::GraphQLContext;
use crate::event_create::create_event;
use crate::identity::Author;

/// Root mutation type, merged from one object per feature area.
#[derive(MergedObject, Default)]
pub struct MutationRoot(EventMutation);

#[derive(Default)]
pub struct EventMutation;

#[Object]
impl EventMutation {
    /// Creates an event authored by the calling user and announces it to
    /// live subscribers.
    #[graphql(name = "EventCreate")]
    async fn event_create(
        &self,
        ctx: &Context<'_>,
        input: EventCreateInput,
    ) -> Result<EventCreatePayload> {
        let gql = ctx.data::<GraphQLContext>()?;
        let author = ctx.data_opt::<Author>();
        let (fields, client_mutation_id) = input.into_parts();

        let event = create_event(
            &gql.pool,
            &gql.pubsub,
            gql.operation_timeout,
            author,
            fields,
        )
        .await
        .map_err(|e| e.extend())?;

        Ok(EventCreatePayload {
            id: ID(event.id),
            client_mutation_id,
        })
    }
}
