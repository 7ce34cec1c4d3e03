//! HTTP handlers.

use super::AppState;
use crate::agent;
use crate::error::{BridgeError, Result};
use crate::realtime::RealtimeSession;
use crate::video::{AgentConnectRequest, CallRef};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

// === Response Types ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsResponse {
    api_key: String,
    token: String,
    cid: String,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// HTTP status for a failure that happened before the response was sent.
fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::ConnectTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        BridgeError::Connect(_)
        | BridgeError::WebSocket(_)
        | BridgeError::Realtime(_)
        | BridgeError::SessionClosed => StatusCode::BAD_GATEWAY,
        BridgeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

pub(super) async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.live_count(),
    })
}

/// Mint credentials for a brand-new call.
pub(super) async fn credentials(State(state): State<Arc<AppState>>) -> Response {
    let call_id = Uuid::new_v4().to_string();
    let call = state
        .platform
        .call(&state.settings.stream.call_type, &call_id);
    let user_id = state.settings.stream.user_id_for(&call_id);

    match state.platform.generate_user_token(&user_id) {
        Ok(token) => {
            info!(cid = %call, %user_id, "Issued call credentials");
            Json(CredentialsResponse {
                api_key: state.platform.api_key().to_string(),
                token,
                cid: call.cid(),
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to sign user token");
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// Attach the realtime agent to an existing call.
pub(super) async fn connect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    if id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Call id must not be empty");
    }

    let call = state
        .platform
        .call(&state.settings.stream.call_type, &id);
    let cid = call.cid();

    let Some(reservation) = state.sessions.reserve(&cid) else {
        return error_response(
            StatusCode::CONFLICT,
            format!("An agent is already connected to call {}", cid),
        );
    };

    match attach_agent(&state, &call).await {
        Ok(session) => {
            reservation.commit(session);
            Json(OkResponse { ok: true }).into_response()
        }
        Err(e) => {
            error!(%cid, error = %e, "Failed to connect agent");
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// Detach the agent from a call.
pub(super) async fn disconnect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let call = state
        .platform
        .call(&state.settings.stream.call_type, &id);

    match state.sessions.remove(&call.cid()) {
        Some(session) => {
            session.disconnect().await;
            info!(cid = %call, "Agent disconnected");
            Json(OkResponse { ok: true }).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No agent connected to call {}", call.cid()),
        ),
    }
}

/// Bridge the call and configure the agent. A session whose setup fails is
/// torn down before the error is returned.
#[instrument(skip(state), fields(cid = %call))]
async fn attach_agent(state: &AppState, call: &CallRef) -> Result<Arc<dyn RealtimeSession>> {
    let settings = &state.settings.agent;
    let request = AgentConnectRequest {
        call,
        openai_api_key: &state.credentials.openai_api_key,
        agent_user_id: &settings.user_id,
        model: settings.model.as_deref(),
    };

    info!("Connecting agent");
    let session = tokio::time::timeout(
        settings.connect_timeout(),
        state.platform.connect_openai(request),
    )
    .await
    .map_err(|_| BridgeError::ConnectTimeout(settings.connect_timeout_seconds))??;

    if let Err(e) = agent::setup_session(session.as_ref(), settings).await {
        session.disconnect().await;
        return Err(e);
    }

    info!("Agent connected and configured");
    Ok(session)
}
