//! HTTP API handlers: health, registry event submission, TEL queries,
//! key-state observations, and witness discovery URLs.

use crate::AppState;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tessera_db::store;
use tessera_registry::coding::IndexedSignature;
use tessera_registry::{RegistryError, Serder};
use tessera_types::AnchorSeal;
use thiserror::Error;

/// API error responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Request body for `POST /registry/events`: the canonical event text,
/// its claimed controller anchor seal, and any backer signatures in
/// indexed qb64 form.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// The canonical event serialization, exactly as produced.
    pub event: String,
    /// The controller anchor seal for the event.
    pub seal: AnchorSeal,
    /// Indexed backer signatures (qb64).
    #[serde(default)]
    pub sigs: Vec<String>,
}

/// Machine-readable validation outcome, designed for retry schedulers to
/// pattern-match without parsing error text.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Disposition {
    /// The event is accepted into the confirmed TEL index.
    Accepted {
        registry: String,
        sn: u64,
        digest: String,
    },
    /// Escrowed: the controller anchor has not resolved yet.
    AwaitingAnchor {
        registry: String,
        sn: u64,
        digest: String,
    },
    /// Escrowed: the backer-signature threshold is unmet.
    AwaitingSignatures {
        registry: String,
        sn: u64,
        digest: String,
        have: usize,
        need: u64,
    },
}

/// Validates one submission against the registry core. Blocking: callers
/// run this on a blocking thread.
pub(crate) fn process_submission(
    state: &AppState,
    request: SubmitRequest,
) -> Result<Disposition, ApiError> {
    let serder = Serder::from_raw(request.event.as_bytes())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let sigs = request
        .sigs
        .iter()
        .map(|s| IndexedSignature::from_qb64(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let conn = state
        .pool
        .get()
        .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
    let oracle = state
        .oracle
        .read()
        .map_err(|_| ApiError::InternalServerError("oracle lock poisoned".to_string()))?;
    let mut tevery = state
        .tevery
        .lock()
        .map_err(|_| ApiError::InternalServerError("tevery lock poisoned".to_string()))?;

    let registry = serder.pre().to_string();
    let sn = serder
        .sn()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let digest = serder.digest(tessera_types::DigestCode::Blake3_256);

    match tevery.process(&serder, &request.seal, &sigs, &*oracle, &conn) {
        Ok(()) => Ok(Disposition::Accepted {
            registry,
            sn,
            digest,
        }),
        Err(RegistryError::MissingAnchor { registry_id, sn, digest }) => {
            Ok(Disposition::AwaitingAnchor {
                registry: registry_id,
                sn,
                digest,
            })
        }
        Err(RegistryError::MissingBackerSignatures {
            registry_id,
            sn,
            digest,
            have,
            need,
        }) => Ok(Disposition::AwaitingSignatures {
            registry: registry_id,
            sn,
            digest,
            have,
            need,
        }),
        Err(RegistryError::Store(e)) => Err(ApiError::InternalServerError(e.to_string())),
        Err(e) => Err(ApiError::BadRequest(e.to_string())),
    }
}

/// Handler for `POST /registry/events`.
///
/// Accepted events return `200`; escrowed events return `202` with the
/// escrow disposition, and can be resubmitted as corroborating data
/// arrives.
pub async fn submit_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<Response, ApiError> {
    let disposition = tokio::task::spawn_blocking(move || process_submission(&state, request))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join failed: {e}")))??;

    let status = match disposition {
        Disposition::Accepted { .. } => StatusCode::OK,
        _ => StatusCode::ACCEPTED,
    };
    Ok((status, Json(disposition)).into_response())
}

/// Handler for `GET /registry/{registry_id}/tel/{sn}`: the confirmed
/// event at that sequence, as its canonical JSON.
pub async fn tel_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((registry_id, sn)): Path<(String, u64)>,
) -> Result<Json<Value>, ApiError> {
    let raw = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ApiError> {
        let conn = state
            .pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {e}")))?;
        let digest = store::confirmed_digest(&conn, &registry_id, sn)
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?
            .ok_or_else(|| {
                ApiError::NotFound(format!("no confirmed event at ({registry_id}, {sn})"))
            })?;
        store::raw_event(&conn, &registry_id, &digest)
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?
            .ok_or_else(|| {
                ApiError::InternalServerError(format!(
                    "confirmed digest '{digest}' has no stored event"
                ))
            })
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join failed: {e}")))??;

    let event: Value = serde_json::from_slice(&raw)
        .map_err(|e| ApiError::InternalServerError(format!("stored event is not JSON: {e}")))?;
    Ok(Json(event))
}

/// Request body for `POST /kel/observations`: one observed controller
/// key event, fed into the key-state oracle.
#[derive(Debug, Deserialize)]
pub struct ObservationRequest {
    /// Controller identifier prefix.
    pub i: String,
    /// Event sequence number.
    pub s: u64,
    /// Event digest (qb64).
    pub d: String,
}

/// Handler for `POST /kel/observations`.
pub async fn observe_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ObservationRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.d.is_empty() {
        return Err(ApiError::BadRequest(
            "observation digest cannot be empty".to_string(),
        ));
    }
    let mut oracle = state
        .oracle
        .write()
        .map_err(|_| ApiError::InternalServerError("oracle lock poisoned".to_string()))?;
    oracle.insert(&request.i, request.s, &request.d);
    tracing::debug!(controller = %request.i, sn = request.s, "recorded key-state observation");
    Ok(Json(json!({ "recorded": true })))
}

/// Handler for `GET /oobi/{controller}/witness`: discovery URLs for the
/// controller through this service's configured witnesses.
pub async fn oobi_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(controller): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let urls = crate::oobi::witness_oobis(&controller, &state.witnesses)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    Ok(Json(json!({ "oobis": urls })))
}

/// Health check handler.
///
/// Returns `200 OK` with server status, version, and the service's
/// non-transferable identifier prefix.
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": "0.0.1",
        "prefix": state.service_prefix,
    }))
}
