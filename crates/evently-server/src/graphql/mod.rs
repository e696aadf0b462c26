//! GraphQL schema composition.
//!
//! The schema always exposes a query and a mutation root. The
//! subscription root is optional: when disabled the schema is built with
//! [`EmptySubscription`] and no subscription type appears in the SDL.
//! Both variants share the same [`GraphQLContext`], so a mutation publishes
//! to the same channel a subscription reads from.

mod errors;
mod mutation;
mod query;
mod subscription;
mod types;

use std::time::Duration;

use async_graphql::{EmptySubscription, Request, Response, Schema};
use evently_db::DbPool;
use evently_pubsub::PubSub;

pub(crate) use errors::internal_error;
pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use subscription::SubscriptionRoot;
pub use types::{EventAddedPayload, EventCreateInput, EventCreatePayload, EventNode, UserNode};

/// Schema without a subscription root.
pub type BaseSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Schema with the `eventAdded` subscription attached.
pub type LiveSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Services available to every resolver.
#[derive(Clone)]
pub struct GraphQLContext {
    pub pool: DbPool,
    pub pubsub: PubSub,
    /// Bound for each suspend point of a mutation.
    pub operation_timeout: Duration,
}

/// Options controlling schema composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Attach the subscription root.
    pub subscriptions: bool,
    pub operation_timeout: Duration,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            subscriptions: false,
            operation_timeout: Duration::from_secs(10),
        }
    }
}

/// The composed schema, with or without subscriptions.
#[derive(Clone)]
pub enum AppSchema {
    Base(BaseSchema),
    Live(LiveSchema),
}

impl AppSchema {
    /// Executes a query or mutation.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        match self {
            Self::Base(schema) => schema.execute(request).await,
            Self::Live(schema) => schema.execute(request).await,
        }
    }

    /// The schema in SDL form.
    pub fn sdl(&self) -> String {
        match self {
            Self::Base(schema) => schema.sdl(),
            Self::Live(schema) => schema.sdl(),
        }
    }

    /// The subscription-capable schema, if subscriptions are enabled.
    pub fn subscriptions(&self) -> Option<&LiveSchema> {
        match self {
            Self::Base(_) => None,
            Self::Live(schema) => Some(schema),
        }
    }
}

/// Composes the schema over an explicit pool and channel.
pub fn build_schema(pool: DbPool, pubsub: PubSub, options: SchemaOptions) -> AppSchema {
    let context = GraphQLContext {
        pool,
        pubsub,
        operation_timeout: options.operation_timeout,
    };

    if options.subscriptions {
        AppSchema::Live(
            Schema::build(QueryRoot::default(), MutationRoot::default(), SubscriptionRoot)
                .data(context)
                .finish(),
        )
    } else {
        AppSchema::Base(
            Schema::build(
                QueryRoot::default(),
                MutationRoot::default(),
                EmptySubscription,
            )
            .data(context)
            .finish(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Author;
    use evently_db::{create_pool, run_migrations, DbRuntimeSettings};
    use evently_pubsub::topics;
    use futures_util::StreamExt;
    use serde_json::json;

    fn test_pool() -> DbPool {
        let pool = create_pool(
            ":memory:",
            DbRuntimeSettings {
                busy_timeout_ms: 1_000,
                pool_max_size: 1,
            },
        )
        .unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        pool
    }

    fn seed_author(pool: &DbPool, username: &str) -> Author {
        let user = evently_store::create_user(&pool.get().unwrap(), username).unwrap();
        Author { user_id: user.id }
    }

    const CREATE: &str = r#"
        mutation Create($input: EventCreateInput!) {
            EventCreate(input: $input) { id clientMutationId }
        }
    "#;

    fn launch_vars() -> async_graphql::Variables {
        async_graphql::Variables::from_json(json!({
            "input": {
                "title": "Launch",
                "date": "2024-01-01",
                "description": "Kickoff",
                "clientMutationId": "abc-1"
            }
        }))
    }

    #[test]
    fn base_schema_has_no_subscription_type() {
        let schema = build_schema(test_pool(), PubSub::default(), SchemaOptions::default());
        assert!(schema.subscriptions().is_none());

        let sdl = schema.sdl();
        assert!(sdl.contains("EventCreate("));
        assert!(sdl.contains("input EventCreateInput"));
        assert!(!sdl.contains("type Subscription"));
        assert!(!sdl.contains("eventAdded:"));
        assert!(!sdl.contains("type EventAdded"));
    }

    #[test]
    fn live_schema_exposes_event_added() {
        let options = SchemaOptions {
            subscriptions: true,
            ..SchemaOptions::default()
        };
        let schema = build_schema(test_pool(), PubSub::default(), options);
        assert!(schema.subscriptions().is_some());
        let sdl = schema.sdl();
        assert!(sdl.contains("type Subscription"));
        assert!(sdl.contains("eventAdded: EventAdded!"));
    }

    #[tokio::test]
    async fn event_create_echoes_client_mutation_id() {
        let pool = test_pool();
        let author = seed_author(&pool, "ada");
        let schema = build_schema(pool.clone(), PubSub::default(), SchemaOptions::default());

        let response = schema
            .execute(Request::new(CREATE).variables(launch_vars()).data(author))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let data = response.data.into_json().unwrap();
        assert_eq!(data["EventCreate"]["clientMutationId"], "abc-1");
        let id = data["EventCreate"]["id"].as_str().unwrap().to_string();

        let stored = evently_store::get_event(&pool.get().unwrap(), &id).unwrap();
        assert_eq!(stored.title, "Launch");
    }

    #[tokio::test]
    async fn missing_field_is_rejected_before_any_side_effect() {
        let pool = test_pool();
        let author = seed_author(&pool, "ada");
        let pubsub = PubSub::default();
        let mut sub = pubsub.subscribe(topics::EVENT_ADDED).await.unwrap();
        let schema = build_schema(pool.clone(), pubsub, SchemaOptions::default());

        let vars = async_graphql::Variables::from_json(json!({
            "input": { "title": "Launch", "date": "2024-01-01" }
        }));
        let response = schema
            .execute(Request::new(CREATE).variables(vars).data(author))
            .await;

        assert!(!response.errors.is_empty());
        let count: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn anonymous_create_reports_identity_code() {
        let schema = build_schema(test_pool(), PubSub::default(), SchemaOptions::default());

        let response = schema
            .execute(Request::new(CREATE).variables(launch_vars()))
            .await;

        assert_eq!(response.errors.len(), 1);
        let error = serde_json::to_value(&response.errors[0]).unwrap();
        assert_eq!(error["extensions"]["code"], "IDENTITY");
    }

    #[tokio::test]
    async fn closed_channel_reports_notification_code_with_id() {
        let pool = test_pool();
        let author = seed_author(&pool, "ada");
        let pubsub = PubSub::default();
        pubsub.close().await;
        let schema = build_schema(pool.clone(), pubsub, SchemaOptions::default());

        let response = schema
            .execute(Request::new(CREATE).variables(launch_vars()).data(author))
            .await;

        assert_eq!(response.errors.len(), 1);
        let error = serde_json::to_value(&response.errors[0]).unwrap();
        assert_eq!(error["extensions"]["code"], "NOTIFICATION");
        let id = error["extensions"]["id"].as_str().unwrap().to_string();
        assert!(evently_store::get_event(&pool.get().unwrap(), &id).is_ok());
    }

    #[tokio::test]
    async fn queries_read_back_created_events() {
        let pool = test_pool();
        let ada = seed_author(&pool, "ada");
        let schema = build_schema(pool.clone(), PubSub::default(), SchemaOptions::default());

        let response = schema
            .execute(Request::new(CREATE).variables(launch_vars()).data(ada.clone()))
            .await;
        let data = response.data.into_json().unwrap();
        let id = data["EventCreate"]["id"].as_str().unwrap().to_string();

        let query = format!(
            r#"{{
                events(limit: 500) {{ id title author {{ username }} }}
                event(id: "{id}") {{ description date }}
                missing: event(id: "nope") {{ id }}
                viewer {{ username active }}
            }}"#
        );
        let response = schema.execute(Request::new(query).data(ada)).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let data = response.data.into_json().unwrap();
        assert_eq!(data["events"][0]["id"], id.as_str());
        assert_eq!(data["events"][0]["author"]["username"], "ada");
        assert_eq!(data["event"]["description"], "Kickoff");
        assert_eq!(data["event"]["date"], "2024-01-01");
        assert!(data["missing"].is_null());
        assert_eq!(data["viewer"]["username"], "ada");
        assert_eq!(data["viewer"]["active"], true);
    }

    #[tokio::test]
    async fn anonymous_viewer_is_null() {
        let schema = build_schema(test_pool(), PubSub::default(), SchemaOptions::default());
        let response = schema.execute("{ viewer { id } }").await;
        assert!(response.errors.is_empty());
        assert!(response.data.into_json().unwrap()["viewer"].is_null());
    }

    #[tokio::test]
    async fn subscription_receives_created_event() {
        let pool = test_pool();
        let author = seed_author(&pool, "ada");
        let pubsub = PubSub::default();
        let options = SchemaOptions {
            subscriptions: true,
            ..SchemaOptions::default()
        };
        let schema = build_schema(pool, pubsub.clone(), options);
        let live = schema.subscriptions().unwrap().clone();

        let listener = tokio::spawn(async move {
            let mut stream =
                live.execute_stream("subscription { eventAdded { newEvent { id title } } }");
            stream.next().await
        });

        // The subscription registers on its first poll.
        while pubsub.subscriber_count(topics::EVENT_ADDED).await == 0 {
            tokio::task::yield_now().await;
        }

        let response = schema
            .execute(Request::new(CREATE).variables(launch_vars()).data(author))
            .await;
        let id = response.data.into_json().unwrap()["EventCreate"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let message = listener.await.unwrap().expect("stream should yield");
        assert!(message.errors.is_empty(), "{:?}", message.errors);
        let data = message.data.into_json().unwrap();
        assert_eq!(data["eventAdded"]["newEvent"]["id"], id.as_str());
        assert_eq!(data["eventAdded"]["newEvent"]["title"], "Launch");
    }
}
