//! Evently server binary.
//!
//! Starts an axum HTTP server exposing the GraphQL API, with structured
//! logging, database initialization, and graceful shutdown on SIGTERM/SIGINT.
//!
//! Usage: `evently-server [config-path] [--seed-user <username> | --deactivate-user <id>]`

use clap::Parser;
use evently_pubsub::PubSub;
use evently_server::{app, config, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn parse_non_empty(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("value must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Parser, Debug)]
#[clap(version, about = "Evently GraphQL server")]
struct CliArgs {
    /// Path to the TOML configuration file. Falls back to
    /// EVENTLY_CONFIG_PATH, then config.toml.
    pub config_path: Option<String>,

    /// Create an active user with this username, print its ID and exit.
    #[clap(long, value_name = "USERNAME", value_parser = parse_non_empty, conflicts_with = "deactivate_user")]
    pub seed_user: Option<String>,

    /// Deactivate the user with this ID and exit. Inactive users cannot
    /// create events.
    #[clap(long, value_name = "USER_ID", value_parser = parse_non_empty)]
    pub deactivate_user: Option<String>,
}

fn resolve_config_path(cli: Option<String>) -> (Option<String>, &'static str) {
    if let Some(path) = cli {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("EVENTLY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();
    let (resolved_config_path, config_source) = resolve_config_path(cli_args.config_path.clone());
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let pool = evently_db::create_pool(&config.database.path, config.database.runtime_settings())
        .expect("failed to create database pool: check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            evently_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }

        if let Some(username) = cli_args.seed_user.as_deref() {
            match evently_store::create_user(&conn, username) {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, username = %user.username, "seeded user");
                    println!("{}", user.id);
                    return;
                }
                Err(e) if e.is_constraint_violation() => {
                    tracing::error!(username, "username is already taken");
                }
                Err(e) => tracing::error!(username, error = %e, "failed to create user"),
            }
            std::process::exit(1);
        }

        if let Some(user_id) = cli_args.deactivate_user.as_deref() {
            match evently_store::set_user_active(&conn, user_id, false) {
                Ok(()) => {
                    tracing::info!(user_id, "deactivated user");
                    return;
                }
                Err(e) => tracing::error!(user_id, error = %e, "failed to deactivate user"),
            }
            std::process::exit(1);
        }
    }

    let pubsub = PubSub::new(config.pubsub.capacity);
    let state = AppState::new(
        pool,
        pubsub.clone(),
        config.graphql.schema_options(),
        config.graphql.graphiql,
    );
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(
        %addr,
        subscriptions = config.graphql.subscriptions,
        graphiql = config.graphql.graphiql,
        "starting evently server"
    );

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    pubsub.close().await;
    tracing::info!("evently server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
