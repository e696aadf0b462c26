//! Evently server library logic.

pub mod config;
pub mod db;
pub mod event_create;
pub mod graphql;
pub mod identity;

use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Extension, Json, Router,
};
use evently_db::DbPool;
use evently_pubsub::PubSub;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use graphql::{build_schema, AppSchema, SchemaOptions};

/// Path of the GraphQL endpoint.
pub const GRAPHQL_PATH: &str = "/graphql";

/// Path of the GraphQL subscription websocket.
pub const GRAPHQL_WS_PATH: &str = "/graphql/ws";

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Topic channel shared by mutations and subscriptions.
    pub pubsub: PubSub,
    /// The composed GraphQL schema.
    pub schema: AppSchema,
    /// Serve the GraphiQL IDE on `GET /graphql`.
    pub graphiql: bool,
}

impl AppState {
    /// Builds the state and composes the schema over `pool` and `pubsub`.
    pub fn new(pool: DbPool, pubsub: PubSub, options: SchemaOptions, graphiql: bool) -> Self {
        let schema = build_schema(pool.clone(), pubsub.clone(), options);
        Self {
            pool,
            pubsub,
            schema,
            graphiql,
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Executes a GraphQL query or mutation.
///
/// The caller's identity header, when present, is attached to the request
/// as an [`identity::Author`]. An unreadable header is rejected outright
/// rather than treated as anonymous.
async fn graphql_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> Result<GraphQLResponse, StatusCode> {
    let mut request = request.into_inner();
    match identity::author_from_headers(&headers) {
        Ok(Some(author)) => request = request.data(author),
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(error = %e, "rejecting graphql request");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    Ok(state.schema.execute(request).await.into())
}

async fn graphiql_handler() -> impl IntoResponse {
    Html(
        GraphiQLSource::build()
            .endpoint(GRAPHQL_PATH)
            .subscription_endpoint(GRAPHQL_WS_PATH)
            .finish(),
    )
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let graphql_route = if state.graphiql {
        post(graphql_handler).get(graphiql_handler)
    } else {
        post(graphql_handler)
    };

    let router = Router::new()
        .route("/health", get(health))
        .route(GRAPHQL_PATH, graphql_route);

    let router = match state.schema.subscriptions() {
        Some(live) => {
            tracing::info!(path = GRAPHQL_WS_PATH, "graphql subscriptions enabled");
            router.route_service(GRAPHQL_WS_PATH, GraphQLSubscription::new(live.clone()))
        }
        None => router,
    };

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
