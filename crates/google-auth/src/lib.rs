//! Google OAuth authentication library
//!
//! Owns the single in-memory credential of the gateway and the two
//! interactions with Google's identity provider: building the consent URL
//! and exchanging the authorization code at the token endpoint.
//!
//! Credential flow:
//! 1. `/auth` calls `AuthorizationFlow::authorization_url()`
//! 2. User consents; Google redirects to `/oauth2callback?code=...`
//! 3. Gateway calls `AuthorizationFlow::exchange_code()`
//! 4. The resulting `Credential` replaces the slot in the `CredentialStore`
//! 5. When Drive rejects the access token, `AuthorizationFlow::refresh()`
//!    trades the refresh token for a new one

pub mod authorize;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod settings;
pub mod token;

pub use authorize::build_authorization_url;
pub use constants::*;
pub use credentials::{Credential, CredentialStore, InMemoryCredentialStore};
pub use error::{Error, Result};
pub use flow::{AuthorizationFlow, Connected};
pub use settings::{ClientCredentials, OAuthSettings};
pub use token::{TokenResponse, exchange_code, refresh_token};
