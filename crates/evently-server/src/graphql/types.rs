//! GraphQL object and input types.

use async_graphql::{Context, InputObject, Object, Result, SimpleObject, ID};
use evently_store::{get_user, Event, User};

use super::{internal_error, GraphQLContext};
use crate::db::with_connection;
use crate::event_create::CreateEvent;

/// An event record.
pub struct EventNode(pub Event);

#[Object(name = "Event")]
impl EventNode {
    async fn id(&self) -> ID {
        ID(self.0.id.clone())
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    /// Text-encoded date exactly as submitted.
    async fn date(&self) -> &str {
        &self.0.date
    }

    async fn description(&self) -> &str {
        &self.0.description
    }

    /// ISO 8601 timestamp assigned when the record was saved.
    async fn created_at(&self) -> &str {
        &self.0.created_at
    }

    /// The user who created the event.
    async fn author(&self, ctx: &Context<'_>) -> Result<UserNode> {
        let gql = ctx.data::<GraphQLContext>()?;
        let author_id = self.0.author_id.clone();
        let user = with_connection(&gql.pool, move |conn| get_user(conn, &author_id))
            .await
            .map_err(|e| internal_error("Event.author", e))?;
        Ok(UserNode(user))
    }
}

/// A user who can author events.
pub struct UserNode(pub User);

#[Object(name = "User")]
impl UserNode {
    async fn id(&self) -> ID {
        ID(self.0.id.clone())
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    async fn active(&self) -> bool {
        self.0.active
    }
}

/// Input of the `EventCreate` mutation.
#[derive(InputObject)]
pub struct EventCreateInput {
    pub title: String,
    pub date: String,
    pub description: String,
    /// Opaque token echoed back on the payload.
    pub client_mutation_id: Option<String>,
}

impl EventCreateInput {
    /// Splits off the correlation token, leaving the record fields.
    pub fn into_parts(self) -> (CreateEvent, Option<String>) {
        (
            CreateEvent {
                title: self.title,
                date: self.date,
                description: self.description,
            },
            self.client_mutation_id,
        )
    }
}

/// Result of the `EventCreate` mutation.
#[derive(SimpleObject)]
pub struct EventCreatePayload {
    /// ID of the new event.
    pub id: ID,
    pub client_mutation_id: Option<String>,
}

/// Message delivered by the `eventAdded` subscription.
pub struct EventAddedPayload(pub Event);

#[Object(name = "EventAdded")]
impl EventAddedPayload {
    async fn new_event(&self) -> EventNode {
        EventNode(self.0.clone())
    }
}
