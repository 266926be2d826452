//! The gateway's single OAuth credential
//!
//! One slot, in memory, for the life of the process. A `set` swaps the whole
//! `Arc<Credential>`, so a reader holding the previous snapshot keeps a
//! consistent access/refresh pair and never sees fields from two exchanges.

use std::sync::{Arc, PoisonError, RwLock};

use common::Secret;
use tracing::debug;

use crate::error::{Error, Result};

/// An authenticated session with Google.
///
/// Always holds a non-empty access token; an unauthenticated process has no
/// `Credential` at all rather than an empty one.
#[derive(Debug, Clone)]
pub struct Credential {
    access_token: Secret<String>,
    refresh_token: Option<Secret<String>>,
    token_uri: String,
    scopes: Vec<String>,
}

impl Credential {
    /// Build a credential, rejecting an empty access token.
    ///
    /// A blank refresh token is treated as absent.
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        token_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Result<Self> {
        if access_token.trim().is_empty() {
            return Err(Error::InvalidResponse("access_token is empty".into()));
        }
        Ok(Self {
            access_token: Secret::new(access_token),
            refresh_token: refresh_token
                .filter(|t| !t.trim().is_empty())
                .map(Secret::new),
            token_uri: token_uri.into(),
            scopes,
        })
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose().as_str())
    }

    /// Token endpoint this credential was issued by (and refreshes against)
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Holder of at most one credential.
///
/// Consumers take `Arc<dyn CredentialStore>` so tests can swap in their own
/// implementation.
pub trait CredentialStore: Send + Sync {
    /// Current credential, if any. Never blocks on I/O.
    fn get(&self) -> Option<Arc<Credential>>;

    /// Replace the slot wholesale.
    fn set(&self, credential: Credential);

    /// Replace the slot only if it still holds `current` (same allocation).
    ///
    /// Returns `false` and leaves the slot alone when another writer got
    /// there first.
    fn replace_if_current(&self, current: &Arc<Credential>, next: Credential) -> bool;
}

/// Process-local credential slot.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    slot: RwLock<Option<Arc<Credential>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self) -> Option<Arc<Credential>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credential: Credential) {
        let credential = Arc::new(credential);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
        debug!("stored credential replaced");
    }

    fn replace_if_current(&self, current: &Arc<Credential>, next: Credential) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(held) if Arc::ptr_eq(held, current) => {
                *slot = Some(Arc::new(next));
                debug!("stored credential refreshed");
                true
            }
            _ => false,
        }
    }
}
