//! Token endpoint calls
//!
//! Both operations POST a form to a token endpoint with different grant
//! types. A code exchange goes to the configured endpoint; a refresh goes to
//! the `token_uri` recorded on the credential. Each call is bounded by
//! `OAuthSettings::timeout`; a non-success status keeps the provider's raw
//! body for diagnosis.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::settings::{ClientCredentials, OAuthSettings};

/// Response from the token endpoint for both exchange and refresh.
///
/// Google omits `refresh_token` on refresh responses and on repeat consents
/// without `prompt=consent`.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Space-separated granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Granted scopes, or `fallback` when the provider did not echo them.
    pub fn granted_scopes(&self, fallback: &[String]) -> Vec<String> {
        match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => fallback.to_vec(),
        }
    }
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    settings: &OAuthSettings,
    credentials: &ClientCredentials<'_>,
    code: &str,
) -> Result<TokenResponse> {
    post_token_form(
        client,
        &settings.token_endpoint,
        settings,
        &[
            ("code", code),
            ("client_id", credentials.client_id),
            ("client_secret", credentials.client_secret),
            ("redirect_uri", credentials.redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

/// Trade a refresh token for a new access token at `token_uri`.
pub async fn refresh_token(
    client: &reqwest::Client,
    token_uri: &str,
    settings: &OAuthSettings,
    credentials: &ClientCredentials<'_>,
    refresh: &str,
) -> Result<TokenResponse> {
    post_token_form(
        client,
        token_uri,
        settings,
        &[
            ("refresh_token", refresh),
            ("client_id", credentials.client_id),
            ("client_secret", credentials.client_secret),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

async fn post_token_form(
    client: &reqwest::Client,
    endpoint: &str,
    settings: &OAuthSettings,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    debug!(endpoint, "calling token endpoint");

    let response = client
        .post(endpoint)
        .form(form)
        .timeout(settings.timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(settings.timeout)
            } else {
                Error::Http(format!("token endpoint request failed: {e}"))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(e.to_string()))
}
