//! Shared fixtures for the gateway's unit tests

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use common::Secret;
use drive_client::{DriveApi, DriveError, FileMetadata, FileQuery};
use google_auth::{
    AuthorizationFlow, Credential, CredentialStore, InMemoryCredentialStore, OAuthSettings,
};
use serde_json::Value;

use crate::AppState;
use crate::mcp::MCP_PATH;
use crate::tools::DriveTools;

/// Drive stand-in that records every call and replays queued results.
///
/// Once the queue is empty every call succeeds with no files.
#[derive(Default)]
pub struct FakeDrive {
    calls: Mutex<Vec<(String, FileQuery)>>,
    responses: Mutex<VecDeque<drive_client::Result<Vec<FileMetadata>>>>,
}

impl FakeDrive {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_responses(
        responses: impl IntoIterator<Item = drive_client::Result<Vec<FileMetadata>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::default(),
            responses: Mutex::new(responses.into_iter().collect()),
        })
    }

    /// `(access_token, query)` for every call so far.
    pub fn calls(&self) -> Vec<(String, FileQuery)> {
        self.calls.lock().unwrap().clone()
    }
}

impl DriveApi for FakeDrive {
    fn list_files<'a>(
        &'a self,
        access_token: &'a str,
        query: &'a FileQuery,
    ) -> Pin<Box<dyn Future<Output = drive_client::Result<Vec<FileMetadata>>> + Send + 'a>> {
        self.calls
            .lock()
            .unwrap()
            .push((access_token.to_string(), query.clone()));
        let result = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        Box::pin(async move { result })
    }
}

pub fn file(id: &str, name: &str) -> FileMetadata {
    FileMetadata {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: Some("application/pdf".to_string()),
        modified_time: None,
        web_view_link: None,
    }
}

pub fn unauthorized() -> DriveError {
    DriveError::Unauthorized(r#"{"error":{"code":401,"status":"UNAUTHENTICATED"}}"#.into())
}

/// Settings with every client field present, pointed at `token_endpoint`.
pub fn complete_settings(token_endpoint: &str) -> OAuthSettings {
    OAuthSettings {
        client_id: Some("abc".into()),
        client_secret: Some(Secret::new("xyz".to_string())),
        redirect_uri: Some("https://x/cb".into()),
        token_endpoint: token_endpoint.to_string(),
        timeout: Duration::from_secs(2),
        ..OAuthSettings::default()
    }
}

pub fn incomplete_settings() -> OAuthSettings {
    OAuthSettings::default()
}

pub fn app_state(settings: OAuthSettings, drive: Arc<FakeDrive>) -> AppState {
    let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
    let flow = Arc::new(AuthorizationFlow::new(
        settings,
        "owner@example.com",
        store,
        reqwest::Client::new(),
    ));
    let tools = Arc::new(DriveTools::new(flow.clone(), drive));
    AppState {
        flow,
        tools,
        started_at: Instant::now(),
    }
}

/// Put a credential in the store as if the callback had completed.
///
/// The credential's `token_uri` is the flow's configured token endpoint.
pub fn connect(state: &AppState, access_token: &str, refresh_token: Option<&str>) {
    let credential = Credential::new(
        access_token.to_string(),
        refresh_token.map(str::to_string),
        state.flow.settings().token_endpoint.clone(),
        vec![google_auth::DRIVE_METADATA_READONLY_SCOPE.to_string()],
    )
    .unwrap();
    state.flow.store().set(credential);
}

pub async fn body_json(resp: Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// POST to `/mcp` with the headers the streamable HTTP transport requires.
pub fn mcp_request(message: &Value) -> Request<Body> {
    Request::post(MCP_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json, text/event-stream")
        .body(Body::from(message.to_string()))
        .unwrap()
}

/// First JSON-RPC message in an MCP response.
///
/// Accepts both a plain JSON body and a server-sent event stream, where the
/// message rides in a `data:` line.
pub async fn sse_json(resp: Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    if let Ok(value) = serde_json::from_str(&text) {
        return value;
    }
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .find_map(|data| serde_json::from_str::<Value>(data).ok())
        .unwrap_or_else(|| panic!("no JSON-RPC message in body: {text}"))
}

/// A running token endpoint stub.
pub struct TokenStub {
    pub endpoint: String,
    pub hits: Arc<AtomicUsize>,
}

/// Token endpoint answering every POST with `status` and `body`.
pub async fn start_token_stub(status: StatusCode, body: &'static str) -> TokenStub {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/token",
            post(move |State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (
                    status,
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    body,
                )
                    .into_response()
            }),
        )
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TokenStub {
        endpoint: format!("http://{addr}/token"),
        hits,
    }
}
