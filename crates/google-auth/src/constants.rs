//! Google OAuth endpoints and scopes

use std::time::Duration;

/// Consent screen endpoint
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Read-only access to Drive file metadata. No file contents.
pub const DRIVE_METADATA_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/drive.metadata.readonly";

/// Scopes requested on the consent screen
pub const SCOPES: &[&str] = &[DRIVE_METADATA_READONLY_SCOPE];

/// Upper bound on a single token endpoint round trip
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
