//! Plain HTTP surface: root, consent start, OAuth callback and health

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::metrics;
use crate::router::{AUTH_PATH, CALLBACK_PATH, HEALTH_PATH, ROOT_PATH};

/// Serialize `body` as a JSON response with `status`.
pub fn json_response(status: StatusCode, body: Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Router holding exactly the plain-surface routes.
pub fn plain_router(state: AppState) -> Router {
    Router::new()
        .route(ROOT_PATH, get(root_handler))
        .route(AUTH_PATH, get(auth_handler))
        .route(CALLBACK_PATH, get(callback_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state)
}

async fn root_handler(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        json!({ "status": "running", "owner": state.flow.owner() }),
    )
}

/// Start the consent flow by handing back Google's authorization URL.
#[instrument(skip_all)]
async fn auth_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let auth_url = state
        .flow
        .authorization_url()
        .inspect_err(|e| warn!(error = %e, "cannot build authorization URL"))?;
    info!("authorization URL issued");
    Ok(json_response(StatusCode::OK, json!({ "auth_url": auth_url })))
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

#[instrument(skip_all)]
async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let code = params.code.unwrap_or_default();
    if code.is_empty()
        && let Some(reason) = params.error
    {
        warn!(reason = %reason, "consent was not granted");
        metrics::record_token_exchange("denied");
        return Err(ApiError::AuthorizationDenied(reason));
    }

    match state.flow.exchange_code(&code).await {
        Ok(connected) => {
            metrics::record_token_exchange("success");
            Ok(json_response(
                StatusCode::OK,
                json!({ "status": "connected", "owner": connected.owner }),
            ))
        }
        Err(e) => {
            let outcome = match e {
                google_auth::Error::MissingCode => "missing_code",
                google_auth::Error::Configuration(_) => "misconfigured",
                google_auth::Error::TokenExchange { .. } => "rejected",
                _ => "failed",
            };
            metrics::record_token_exchange(outcome);
            Err(e.into())
        }
    }
}

/// Liveness plus whether a Google account is connected.
async fn health_handler(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        json!({
            "status": "ok",
            "authenticated": state.flow.store().get().is_some(),
            "owner": state.flow.owner(),
            "uptime_seconds": state.started_at.elapsed().as_secs(),
        }),
    )
}
