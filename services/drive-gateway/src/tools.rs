//! Drive tools exposed over MCP
//!
//! Every tool reads the credential store first and never fails the call:
//! problems come back as a soft `{"error": ...}` payload so the agent can
//! relay them. `ToolError` stays typed until `ToolOutput` is built.

use std::borrow::Cow;
use std::sync::Arc;

use drive_client::{DriveApi, DriveError, FileMetadata, FileQuery, name_contains_query};
use google_auth::AuthorizationFlow;
use rmcp::model::{JsonObject, Tool};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::metrics;

pub const LIST_DRIVE_FILES: &str = "list_drive_files";
pub const SEARCH_DRIVE_FILES: &str = "search_drive_files";
pub const GET_AUTH_STATUS: &str = "get_auth_status";

const LIST_DEFAULT_MAX_RESULTS: i64 = 20;
const SEARCH_DEFAULT_MAX_RESULTS: i64 = 10;

/// Upper bound on any page size sent to Drive
pub const MAX_RESULTS_CEILING: u32 = 100;

const NOT_CONNECTED: &str = "No Google account connected yet. Visit /auth to connect one.";

/// Clamp an agent-supplied page size into `1..=100`.
pub fn clamp_max_results(requested: i64) -> u32 {
    requested.clamp(1, i64::from(MAX_RESULTS_CEILING)) as u32
}

/// Payload of a tool result; serialized as the structured content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Files {
        files: Vec<FileMetadata>,
        count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },
    AuthStatus {
        authenticated: bool,
        owner: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        error: String,
    },
}

impl ToolOutput {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error { .. })
    }

    fn files(files: Vec<FileMetadata>, query: Option<String>) -> Self {
        ToolOutput::Files {
            count: files.len(),
            files,
            query,
        }
    }
}

/// Why a tool could not produce files.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{}", NOT_CONNECTED)]
    NotAuthenticated,

    #[error("Drive API call failed: {0}")]
    Delegated(#[from] DriveError),

    #[error("access token expired and could not be refreshed: {0}")]
    Refresh(#[from] google_auth::Error),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl ToolError {
    /// Whether the agent may usefully call the tool again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ToolError::Delegated(e) => e.is_retryable(),
            ToolError::Refresh(e) => e.is_retryable(),
            ToolError::NotAuthenticated | ToolError::InvalidArguments(_) => false,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            ToolError::NotAuthenticated => "unauthenticated",
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::Delegated(_) | ToolError::Refresh(_) => "error",
        }
    }
}

impl From<ToolError> for ToolOutput {
    fn from(err: ToolError) -> Self {
        ToolOutput::Error {
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default = "list_default")]
    max_results: i64,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "search_default")]
    max_results: i64,
}

fn list_default() -> i64 {
    LIST_DEFAULT_MAX_RESULTS
}

fn search_default() -> i64 {
    SEARCH_DEFAULT_MAX_RESULTS
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn schema(value: Value) -> Arc<JsonObject> {
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

fn tool(name: &'static str, description: &'static str, input_schema: Value) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: None,
        description: Some(Cow::Borrowed(description)),
        input_schema: schema(input_schema),
        output_schema: None,
        annotations: None,
        icons: None,
    }
}

/// Tool definitions advertised by `tools/list`.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(
            LIST_DRIVE_FILES,
            "List files in the connected Google Drive (metadata only).",
            json!({
                "type": "object",
                "properties": {
                    "max_results": {
                        "type": "integer",
                        "description": "Number of files to return (1-100)",
                        "default": LIST_DEFAULT_MAX_RESULTS,
                        "minimum": 1,
                        "maximum": MAX_RESULTS_CEILING
                    }
                }
            }),
        ),
        tool(
            SEARCH_DRIVE_FILES,
            "Search the connected Google Drive for files whose name contains the query.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Text to look for in file names"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Number of files to return (1-100)",
                        "default": SEARCH_DEFAULT_MAX_RESULTS,
                        "minimum": 1,
                        "maximum": MAX_RESULTS_CEILING
                    }
                },
                "required": ["query"]
            }),
        ),
        tool(
            GET_AUTH_STATUS,
            "Report whether a Google account is connected and who owns the gateway.",
            json!({ "type": "object", "properties": {} }),
        ),
    ]
}

/// The tool set, backed by the shared credential store and a Drive client.
pub struct DriveTools {
    flow: Arc<AuthorizationFlow>,
    drive: Arc<dyn DriveApi>,
}

impl DriveTools {
    pub fn new(flow: Arc<AuthorizationFlow>, drive: Arc<dyn DriveApi>) -> Self {
        Self { flow, drive }
    }

    /// Run the tool called `name`. `None` means no such tool.
    #[instrument(skip(self, arguments))]
    pub async fn call(&self, name: &str, arguments: Value) -> Option<ToolOutput> {
        let result = match name {
            LIST_DRIVE_FILES => match parse_args::<ListArgs>(arguments) {
                Ok(args) => self.list_drive_files(args.max_results).await,
                Err(e) => Err(e),
            },
            SEARCH_DRIVE_FILES => match parse_args::<SearchArgs>(arguments) {
                Ok(args) => self.search_drive_files(&args.query, args.max_results).await,
                Err(e) => Err(e),
            },
            GET_AUTH_STATUS => Ok(self.get_auth_status()),
            _ => {
                warn!("unknown tool requested");
                return None;
            }
        };

        let output = match result {
            Ok(output) => {
                metrics::record_tool_call(name, "ok");
                output
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "tool call failed");
                metrics::record_tool_call(name, e.outcome());
                e.into()
            }
        };
        Some(output)
    }

    /// List the most recent files, up to `max_results` (clamped).
    pub async fn list_drive_files(&self, max_results: i64) -> Result<ToolOutput, ToolError> {
        let files = self.fetch(None, clamp_max_results(max_results)).await?;
        Ok(ToolOutput::files(files, None))
    }

    /// Files whose name contains `query`, excluding trashed ones.
    pub async fn search_drive_files(
        &self,
        query: &str,
        max_results: i64,
    ) -> Result<ToolOutput, ToolError> {
        let term = query.trim();
        if term.is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".into()));
        }
        let files = self
            .fetch(Some(name_contains_query(term)), clamp_max_results(max_results))
            .await?;
        Ok(ToolOutput::files(files, Some(term.to_string())))
    }

    pub fn get_auth_status(&self) -> ToolOutput {
        let authenticated = self.flow.store().get().is_some();
        ToolOutput::AuthStatus {
            authenticated,
            owner: self.flow.owner().to_string(),
            message: (!authenticated).then(|| NOT_CONNECTED.to_string()),
        }
    }

    /// Delegate one listing to Drive with the stored credential.
    ///
    /// A 401 from Drive triggers one refresh and one retry when the
    /// credential carries a refresh token.
    async fn fetch(&self, query: Option<String>, limit: u32) -> Result<Vec<FileMetadata>, ToolError> {
        let credential = self.flow.store().get().ok_or(ToolError::NotAuthenticated)?;
        let request = FileQuery { query, limit };

        match self.drive.list_files(credential.access_token(), &request).await {
            Err(DriveError::Unauthorized(reason)) if credential.refresh_token().is_some() => {
                info!(reason = %reason, "access token rejected, refreshing");
                let fresh = self.flow.refresh(&credential).await?;
                Ok(self.drive.list_files(fresh.access_token(), &request).await?)
            }
            result => Ok(result?),
        }
    }
}
