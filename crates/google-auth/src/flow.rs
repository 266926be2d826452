//! Authorization-code flow against Google
//!
//! `exchange_code` and `refresh` are the only writers of the credential
//! store. The token endpoint call completes before the store is touched, so
//! no lock is held across the network round trip. A refresh only lands if
//! the credential it started from is still the stored one; a newer
//! connection made meanwhile is never overwritten.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::authorize::build_authorization_url;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{Error, Result};
use crate::settings::OAuthSettings;
use crate::token;

/// Successful completion of the OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connected {
    pub owner: String,
}

/// Builds consent URLs and turns authorization codes into the stored
/// credential.
pub struct AuthorizationFlow {
    settings: OAuthSettings,
    owner: String,
    store: Arc<dyn CredentialStore>,
    http: reqwest::Client,
}

impl AuthorizationFlow {
    pub fn new(
        settings: OAuthSettings,
        owner: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            settings,
            owner: owner.into(),
            store,
            http,
        }
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Identity of the single user this gateway serves
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Consent URL for `/auth`.
    pub fn authorization_url(&self) -> Result<String> {
        build_authorization_url(&self.settings)
    }

    /// Exchange the callback's authorization code and store the credential.
    ///
    /// An empty code fails with `MissingCode` before any network call. On a
    /// provider rejection the store is left as it was.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<Connected> {
        if code.is_empty() {
            return Err(Error::MissingCode);
        }
        let client = self.settings.client_credentials()?;

        let response = token::exchange_code(&self.http, &self.settings, &client, code)
            .await
            .inspect_err(|e| warn!(error = %e, "authorization code exchange failed"))?;

        let scopes = response.granted_scopes(&self.settings.scopes);
        let credential = Credential::new(
            response.access_token,
            response.refresh_token,
            self.settings.token_endpoint.clone(),
            scopes,
        )?;
        let has_refresh_token = credential.refresh_token().is_some();
        self.store.set(credential);

        info!(owner = %self.owner, has_refresh_token, "Google account connected");
        Ok(Connected {
            owner: self.owner.clone(),
        })
    }

    /// Refresh `current` against its own `token_uri` and store the result.
    ///
    /// `current` is the snapshot taken from the store. If the store has
    /// moved on by the time the provider answers, the fresh credential is
    /// still returned to the caller but not stored.
    ///
    /// Google usually omits the refresh token on refresh; the existing one
    /// is carried over in that case.
    #[instrument(skip_all)]
    pub async fn refresh(&self, current: &Arc<Credential>) -> Result<Credential> {
        let refresh = current.refresh_token().ok_or(Error::NoRefreshToken)?;
        let client = self.settings.client_credentials()?;

        let response = token::refresh_token(
            &self.http,
            current.token_uri(),
            &self.settings,
            &client,
            refresh,
        )
        .await
        .inspect_err(|e| warn!(error = %e, "access token refresh failed"))?;

        let scopes = response.granted_scopes(current.scopes());
        let refresh_token = response
            .refresh_token
            .or_else(|| Some(refresh.to_string()));
        let fresh = Credential::new(
            response.access_token,
            refresh_token,
            current.token_uri(),
            scopes,
        )?;
        if self.store.replace_if_current(current, fresh.clone()) {
            info!("access token refreshed");
        } else {
            info!("access token refreshed; stored credential changed meanwhile, keeping it");
        }
        Ok(fresh)
    }
}
