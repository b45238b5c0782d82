//! Tessera server binary — the registry service entry point.
//!
//! Starts the axum HTTP API and the raw TCP message port with structured
//! logging, database initialization, a non-transferable service identity,
//! and graceful shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tessera_server::identity::ServiceIdentity;
use tessera_server::{app, config, tcp, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("TESSERA_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
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

    // Initialize database
    let pool = tessera_db::create_pool(
        &config.database.path,
        tessera_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool — check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = tessera_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Bind the service identity
    let service = match &config.identity.key_path {
        Some(path) => ServiceIdentity::load_or_generate(Path::new(path))
            .expect("failed to load service identity — check identity.key_path in config"),
        None => ServiceIdentity::generate(),
    };
    tracing::info!(prefix = %service.prefix(), "service identity bound");

    // Build application
    let state = Arc::new(AppState::new(
        pool,
        service,
        config.identity.witnesses.clone(),
    ));
    let app = app(state.clone());

    let http_addr = SocketAddr::new(config.server.host, config.server.http_port);
    let tcp_addr = SocketAddr::new(config.server.host, config.server.tcp_port);

    tracing::info!(%http_addr, %tcp_addr, "starting tessera server");

    let http_listener = TcpListener::bind(http_addr)
        .await
        .expect("failed to bind HTTP address — is another process using this port?");
    let tcp_listener = TcpListener::bind(tcp_addr)
        .await
        .expect("failed to bind TCP address — is another process using this port?");

    let tcp_task = tokio::spawn(tcp::serve(tcp_listener, state));

    // Serve with graceful shutdown
    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tcp_task.abort();
    tracing::info!("tessera server shut down");
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
