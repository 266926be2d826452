//! Consent URL construction
//!
//! Pure string building, no network. Parameters are encoded as
//! `application/x-www-form-urlencoded`, so the redirect URI and scope arrive
//! at Google with `:` and `/` percent-encoded and spaces as `+`.

use url::Url;

use crate::error::{Error, Result};
use crate::settings::OAuthSettings;

/// Build the Google consent URL for this client.
///
/// Fails with `Error::Configuration` before touching the endpoint if the
/// client id, secret or redirect URI is unset. `access_type=offline` and
/// `prompt=consent` make Google issue a refresh token on every consent.
pub fn build_authorization_url(settings: &OAuthSettings) -> Result<String> {
    let client = settings.client_credentials()?;
    let scope = settings.scopes.join(" ");

    let url = Url::parse_with_params(
        &settings.authorize_endpoint,
        &[
            ("client_id", client.client_id),
            ("redirect_uri", client.redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| {
        Error::Configuration(format!(
            "invalid authorize endpoint {}: {e}",
            settings.authorize_endpoint
        ))
    })?;

    Ok(url.into())
}
