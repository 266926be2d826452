//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The file is
//! optional; a bare environment is enough to run. The client secret is
//! loaded from GOOGLE_CLIENT_SECRET or `client_secret_file`, never from the
//! TOML directly.
//!
//! Missing OAuth client settings are not a load error: the gateway starts
//! and `/auth` reports them on first use.

use common::Secret;
use google_auth::{AUTHORIZE_ENDPOINT, OAuthSettings, SCOPES, TOKEN_ENDPOINT};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given
const DEFAULT_CONFIG_FILE: &str = "drive-gateway.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub drive: DriveConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
    /// Separate listener for Prometheus metrics; disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

/// Google OAuth client registration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to GOOGLE_CLIENT_SECRET)
    pub client_secret_file: Option<PathBuf>,
    pub redirect_uri: Option<String>,
    /// Identity reported by `/`, `/health` and the callback
    pub owner_email: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub token_timeout_secs: u64,
}

/// Drive API settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_connections: 1000,
            metrics_addr: None,
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_secret_file: None,
            redirect_uri: None,
            owner_email: "owner@example.com".to_string(),
            authorize_endpoint: AUTHORIZE_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            token_timeout_secs: 10,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: drive_client::DEFAULT_DRIVE_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then overlay the
    /// process environment.
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as `load` with an injectable environment lookup.
    ///
    /// Environment variables:
    /// - GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET, GOOGLE_REDIRECT_URI
    /// - OWNER_EMAIL
    /// - LISTEN_ADDR, or PORT (binds 0.0.0.0:PORT) when LISTEN_ADDR is unset
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> common::Result<Self> {
        let mut config: Config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => Config::default(),
        };

        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> common::Result<()> {
        if let Some(id) = env("GOOGLE_CLIENT_ID") {
            self.oauth.client_id = Some(id);
        }
        if let Some(uri) = env("GOOGLE_REDIRECT_URI") {
            self.oauth.redirect_uri = Some(uri);
        }
        if let Some(owner) = env("OWNER_EMAIL").filter(|o| !o.trim().is_empty()) {
            self.oauth.owner_email = owner;
        }

        if let Some(addr) = env("LISTEN_ADDR") {
            self.server.listen_addr = addr.parse().map_err(|e| {
                common::Error::Config(format!("LISTEN_ADDR {addr:?} is not a socket address: {e}"))
            })?;
        } else if let Some(port) = env("PORT") {
            let port: u16 = port.parse().map_err(|e| {
                common::Error::Config(format!("PORT {port:?} is not a port number: {e}"))
            })?;
            self.server.listen_addr = SocketAddr::from(([0, 0, 0, 0], port));
        }

        // Client secret: a non-blank env var takes precedence over file
        let env_secret = env("GOOGLE_CLIENT_SECRET")
            .map(Secret::new)
            .filter(|s| !s.is_blank());
        if let Some(secret) = env_secret {
            self.oauth.client_secret = Some(secret);
        } else if let Some(ref secret_file) = self.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = Secret::new(secret.trim().to_owned());
            if !secret.is_blank() {
                self.oauth.client_secret = Some(secret);
            }
        }

        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        for (name, url) in [
            ("oauth.authorize_endpoint", &self.oauth.authorize_endpoint),
            ("oauth.token_endpoint", &self.oauth.token_endpoint),
            ("drive.api_base", &self.drive.api_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.oauth.token_timeout_secs == 0 {
            return Err(common::Error::Config(
                "oauth.token_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.drive.timeout_secs == 0 {
            return Err(common::Error::Config(
                "drive.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "server.max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// OAuth settings handed to the authorization flow.
    pub fn oauth_settings(&self) -> OAuthSettings {
        OAuthSettings {
            client_id: self.oauth.client_id.clone(),
            client_secret: self.oauth.client_secret.clone(),
            redirect_uri: self.oauth.redirect_uri.clone(),
            authorize_endpoint: self.oauth.authorize_endpoint.clone(),
            token_endpoint: self.oauth.token_endpoint.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(self.oauth.token_timeout_secs),
        }
    }

    /// Resolve the config file from CLI arg or CONFIG_PATH env var, falling
    /// back to `drive-gateway.toml` when it exists. `None` means env-only.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        Self::resolve_path_with(cli_path, |key| std::env::var(key).ok())
    }

    fn resolve_path_with(
        cli_path: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Some(p) = env("CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }
}
