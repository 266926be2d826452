//! Plain-surface error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::handlers::json_response;

/// Errors returned by the plain HTTP handlers, rendered as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] google_auth::Error),

    /// The user declined consent or Google reported a problem on redirect
    #[error("Authorization failed: {0}")]
    AuthorizationDenied(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(google_auth::Error::MissingCode) | ApiError::AuthorizationDenied(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `detail` field.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Auth(google_auth::Error::Configuration(reason)) => {
                format!("OAuth environment variables missing ({reason})")
            }
            ApiError::Auth(google_auth::Error::TokenExchange { body, .. }) => {
                format!("Token exchange failed: {body}")
            }
            ApiError::Auth(google_auth::Error::MissingCode) => "Missing code".to_string(),
            ApiError::Auth(other) => format!("Token exchange failed: {other}"),
            ApiError::AuthorizationDenied(_) => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_response(self.status(), json!({ "detail": self.detail() }))
    }
}
