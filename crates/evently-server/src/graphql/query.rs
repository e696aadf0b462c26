//! Query resolvers.

use async_graphql::{Context, MergedObject, Object, Result, ID};
use evently_store::{find_events, get_event, get_user, EventFilter, StoreError};

use super::types::{EventNode, UserNode};
use super::{internal_error, GraphQLContext};
use crate::db::{with_connection, DbTaskError};
use crate::identity::Author;

/// Maximum page size for `events`.
const MAX_EVENTS_LIMIT: i32 = 100;

/// Root query type, merged from one object per feature area.
#[derive(MergedObject, Default)]
pub struct QueryRoot(EventQuery, ViewerQuery);

#[derive(Default)]
pub struct EventQuery;

#[Object]
impl EventQuery {
    /// Most recent events, newest first.
    async fn events(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20)] limit: i32,
        #[graphql(desc = "Only events created by this user")] author: Option<ID>,
    ) -> Result<Vec<EventNode>> {
        let gql = ctx.data::<GraphQLContext>()?;
        let filter = EventFilter {
            author_id: author.map(|id| id.0),
            limit: Some(limit.clamp(1, MAX_EVENTS_LIMIT) as u32),
        };

        let events = with_connection(&gql.pool, move |conn| find_events(conn, &filter))
            .await
            .map_err(|e| internal_error("events", e))?;
        Ok(events.into_iter().map(EventNode).collect())
    }

    /// A single event, or null if no event has this ID.
    async fn event(&self, ctx: &Context<'_>, id: ID) -> Result<Option<EventNode>> {
        let gql = ctx.data::<GraphQLContext>()?;
        match with_connection(&gql.pool, move |conn| get_event(conn, &id)).await {
            Ok(event) => Ok(Some(EventNode(event))),
            Err(DbTaskError::Store(StoreError::EventNotFound(_))) => Ok(None),
            Err(e) => Err(internal_error("event", e)),
        }
    }
}

#[derive(Default)]
pub struct ViewerQuery;

#[Object]
impl ViewerQuery {
    /// The user named by the request's identity header, if any.
    async fn viewer(&self, ctx: &Context<'_>) -> Result<Option<UserNode>> {
        let gql = ctx.data::<GraphQLContext>()?;
        let Some(author) = ctx.data_opt::<Author>() else {
            return Ok(None);
        };

        let user_id = author.user_id.clone();
        match with_connection(&gql.pool, move |conn| get_user(conn, &user_id)).await {
            Ok(user) => Ok(Some(UserNode(user))),
            Err(DbTaskError::Store(StoreError::UserNotFound(_))) => Ok(None),
            Err(e) => Err(internal_error("viewer", e)),
        }
    }
}
