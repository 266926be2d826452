//! OAuth client settings
//!
//! Client id, secret and redirect URI are optional here: the gateway starts
//! without them and only fails when a flow actually needs them.

use std::time::Duration;

use common::Secret;

use crate::constants::{AUTHORIZE_ENDPOINT, DEFAULT_TOKEN_TIMEOUT, SCOPES, TOKEN_ENDPOINT};
use crate::error::{Error, Result};

/// Process-wide OAuth client configuration.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<Secret<String>>,
    pub redirect_uri: Option<String>,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub scopes: Vec<String>,
    /// Bound on each token endpoint call
    pub timeout: Duration,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            authorize_endpoint: AUTHORIZE_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }
}

/// Borrowed view of a complete client registration.
#[derive(Debug, Clone, Copy)]
pub struct ClientCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
}

impl OAuthSettings {
    /// Check that client id, secret and redirect URI are all present and
    /// non-blank.
    ///
    /// The error lists every missing field, not just the first.
    pub fn client_credentials(&self) -> Result<ClientCredentials<'_>> {
        let client_id = non_blank(self.client_id.as_deref());
        let client_secret = non_blank(self.client_secret.as_ref().map(|s| s.expose().as_str()));
        let redirect_uri = non_blank(self.redirect_uri.as_deref());

        match (client_id, client_secret, redirect_uri) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(ClientCredentials {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => {
                let missing: Vec<&str> = [
                    ("client_id", client_id.is_none()),
                    ("client_secret", client_secret.is_none()),
                    ("redirect_uri", redirect_uri.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(Error::Configuration(format!(
                    "missing {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// Whether `client_credentials()` would succeed.
    pub fn is_complete(&self) -> bool {
        self.client_credentials().is_ok()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
