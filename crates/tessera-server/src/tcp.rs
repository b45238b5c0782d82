//! Raw TCP message port.
//!
//! A minimal line protocol for peers that exchange events without HTTP:
//! each line is one submission in the same JSON shape as
//! `POST /registry/events`, answered with one line holding either the
//! disposition or an error object. Heavier framing is out of scope; this
//! port exists so constrained peers can reach the same validation path.

use crate::api::{process_submission, ApiError, SubmitRequest};
use crate::AppState;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Accepts connections until the listener is dropped, spawning one task
/// per peer.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tracing::debug!(%addr, "tcp peer connected");
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state).await {
                        tracing::debug!(%addr, error = %e, "tcp peer connection ended");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "tcp accept failed");
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<AppState>) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(&state, &line).await;
        write_half.write_all(response.to_string().as_bytes()).await?;
        write_half.write_all(b"\n").await?;
    }
    Ok(())
}

/// Processes one submission line into one response value.
async fn respond(state: &Arc<AppState>, line: &str) -> serde_json::Value {
    let request: SubmitRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return serde_json::json!({ "error": format!("invalid submission: {e}") }),
    };

    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || process_submission(&state, request)).await;

    match result {
        Ok(Ok(disposition)) => {
            serde_json::to_value(&disposition).unwrap_or_else(|e| {
                serde_json::json!({ "error": format!("response encoding failed: {e}") })
            })
        }
        Ok(Err(ApiError::InternalServerError(msg))) => {
            serde_json::json!({ "error": format!("internal error: {msg}") })
        }
        Ok(Err(e)) => serde_json::json!({ "error": e.to_string() }),
        Err(e) => serde_json::json!({ "error": format!("task join failed: {e}") }),
    }
}
