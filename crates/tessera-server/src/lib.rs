//! Tessera server library logic.
//!
//! Wires the TEL core to its two network surfaces: an axum HTTP API and a
//! raw TCP message port. The server performs no registry validation of
//! its own — every submission flows through `tessera-registry`'s engine
//! against the shared store and key-state oracle.

pub mod api;
pub mod config;
pub mod identity;
pub mod oobi;
pub mod tcp;

use axum::routing::{get, post};
use axum::{Extension, Router};
use config::WitnessConfig;
use ed25519_dalek::SigningKey;
use std::sync::{Arc, Mutex, RwLock};
use tessera_db::DbPool;
use tessera_registry::{InMemoryOracle, Tevery};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Registry-keyed validation state. The lock serializes validation,
    /// which the engine requires for same-registry submissions.
    pub tevery: Mutex<Tevery>,
    /// Controller key-state oracle, fed by `/kel/observations`.
    pub oracle: RwLock<InMemoryOracle>,
    /// The local service signing key (Ed25519, non-transferable).
    pub signing_key: Arc<SigningKey>,
    /// The service's identifier prefix (`B…`).
    pub service_prefix: String,
    /// Configured witnesses for discovery URL generation.
    pub witnesses: Vec<WitnessConfig>,
}

impl AppState {
    /// Assembles the shared state.
    pub fn new(
        pool: DbPool,
        service: identity::ServiceIdentity,
        witnesses: Vec<WitnessConfig>,
    ) -> Self {
        let prefix = service.prefix().to_string();
        Self {
            pool,
            tevery: Mutex::new(Tevery::new()),
            oracle: RwLock::new(InMemoryOracle::new()),
            signing_key: Arc::new(service.signing_key().clone()),
            service_prefix: prefix,
            witnesses,
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/registry/events", post(api::submit_handler))
        .route("/registry/{registry_id}/tel/{sn}", get(api::tel_handler))
        .route("/kel/observations", post(api::observe_handler))
        .route("/oobi/{controller}/witness", get(api::oobi_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
