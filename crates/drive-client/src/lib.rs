//! Google Drive file listing
//!
//! Defines the `DriveApi` trait that decouples the gateway's tools from the
//! Drive HTTP API. `GoogleDriveClient` is the production implementation;
//! tests substitute their own.

pub mod google;

pub use google::{DEFAULT_DRIVE_API_BASE, GoogleDriveClient, name_contains_query};

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Metadata for one Drive file. Never includes content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// One page of a file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    /// Drive search expression (`q` parameter); `None` lists everything
    pub query: Option<String>,
    /// Page size, already clamped by the caller
    pub limit: u32,
}

/// Errors from Drive API calls.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    /// The access token was rejected (expired or revoked)
    #[error("Drive rejected the access token: {0}")]
    Unauthorized(String),

    #[error("Drive API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Drive API did not answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Drive API request failed: {0}")]
    Http(String),

    #[error("invalid Drive API response: {0}")]
    InvalidResponse(String),
}

impl DriveError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DriveError::Timeout(_) | DriveError::Http(_) => true,
            DriveError::Status { status, .. } => *status == 429 || *status >= 500,
            DriveError::Unauthorized(_) | DriveError::InvalidResponse(_) => false,
        }
    }
}

/// Result alias for Drive operations.
pub type Result<T> = std::result::Result<T, DriveError>;

/// The Drive capability the gateway delegates to.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn DriveApi>`).
pub trait DriveApi: Send + Sync {
    /// Fetch a single page of file metadata using `access_token`.
    fn list_files<'a>(
        &'a self,
        access_token: &'a str,
        query: &'a FileQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileMetadata>>> + Send + 'a>>;
}
