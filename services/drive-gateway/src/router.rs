//! Request routing between the plain HTTP surface and the MCP facade
//!
//! Classification is an exact match against a fixed allow-list. No prefix
//! matching, no trailing-slash folding: `/health/` is not `/health`. Each
//! surface is its own axum router; the dispatcher only picks one and
//! forwards the untouched request.

use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use tower::ServiceExt;
use tracing::{debug, instrument};

use crate::metrics;

pub const ROOT_PATH: &str = "/";
pub const AUTH_PATH: &str = "/auth";
pub const CALLBACK_PATH: &str = "/oauth2callback";
pub const HEALTH_PATH: &str = "/health";

/// Paths served by the plain HTTP surface
pub const PLAIN_PATHS: [&str; 4] = [ROOT_PATH, AUTH_PATH, CALLBACK_PATH, HEALTH_PATH];

/// Which surface handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Plain,
    Tool,
}

impl Surface {
    pub fn label(self) -> &'static str {
        match self {
            Surface::Plain => "plain",
            Surface::Tool => "tool",
        }
    }
}

/// Decide the surface for `path`.
pub fn classify(path: &str) -> Surface {
    if PLAIN_PATHS.contains(&path) {
        Surface::Plain
    } else {
        Surface::Tool
    }
}

/// State for the top-level dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    plain: Router,
    tools: Router,
}

impl Dispatcher {
    pub fn new(plain: Router, tools: Router) -> Self {
        Self { plain, tools }
    }

    fn surface(&self, surface: Surface) -> Router {
        match surface {
            Surface::Plain => self.plain.clone(),
            Surface::Tool => self.tools.clone(),
        }
    }
}

/// Entry point for every request on the main listener.
pub async fn dispatch(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    route(dispatcher, request, request_id).await
}

#[instrument(skip_all, fields(request_id = %request_id, method = %request.method(), path = %request.uri().path()))]
async fn route(dispatcher: Dispatcher, request: Request<Body>, request_id: String) -> Response {
    let started = Instant::now();
    let surface = classify(request.uri().path());

    let response = match dispatcher.surface(surface).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let status = response.status().as_u16();
    metrics::record_request(surface, status, started.elapsed().as_secs_f64());
    debug!(surface = surface.label(), status, "request handled");
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::test_support::{
        FakeDrive, app_state, body_json, connect, incomplete_settings, mcp_request, sse_json,
    };
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn allow_list_paths_are_plain() {
        for path in PLAIN_PATHS {
            assert_eq!(classify(path), Surface::Plain, "{path}");
        }
    }

    #[test]
    fn near_misses_are_tool() {
        for path in [
            "",
            "//",
            "/mcp",
            "/health/",
            "/Health",
            "/auth/",
            "/authx",
            "/auth/callback",
            "/oauth2callback/",
            "/oauth2callback2",
            "/metrics",
            "/google_drive_list",
            "/%2Fhealth",
        ] {
            assert_eq!(classify(path), Surface::Tool, "{path:?}");
        }
    }

    #[test]
    fn random_paths_are_tool() {
        for _ in 0..256 {
            let id = uuid::Uuid::new_v4();
            for path in [format!("/{id}"), format!("/health/{id}"), format!("/{}", id.simple())] {
                assert_eq!(classify(&path), Surface::Tool, "{path}");
            }
        }
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router.oneshot(request).await.unwrap();
        let status = resp.status();
        (status, body_json(resp).await)
    }

    #[tokio::test]
    async fn every_plain_path_reaches_a_plain_handler() {
        let state = app_state(incomplete_settings(), FakeDrive::empty());
        let router = build_router(state, 16);

        for path in PLAIN_PATHS {
            let (status, body) = send(
                router.clone(),
                Request::get(path).body(Body::empty()).unwrap(),
            )
            .await;
            assert_ne!(status, StatusCode::NOT_FOUND, "{path}");
            assert!(body.get("jsonrpc").is_none(), "{path} must not reach MCP");
        }
    }

    #[tokio::test]
    async fn tool_paths_reach_mcp() {
        let state = app_state(incomplete_settings(), FakeDrive::empty());
        let router = build_router(state, 16);

        let (status, body) = send(
            router.clone(),
            Request::get("/health/").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["jsonrpc"], "2.0");

        let resp = router
            .oneshot(mcp_request(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                                         "params": {"name": "get_auth_status"}})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = sse_json(resp).await;
        assert_eq!(body["result"]["structuredContent"]["authenticated"], false);
    }

    #[tokio::test]
    async fn wrong_method_on_plain_path_stays_plain() {
        let state = app_state(incomplete_settings(), FakeDrive::empty());
        let router = build_router(state, 16);

        let resp = router
            .oneshot(Request::post("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn query_string_does_not_affect_classification() {
        let state = app_state(incomplete_settings(), FakeDrive::empty());
        connect(&state, "t1", None);
        let router = build_router(state, 16);

        let (status, body) = send(
            router,
            Request::get("/health?verbose=1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticated"], true);
    }

    #[tokio::test]
    async fn tool_surface_shares_the_credential_store() {
        let state = app_state(incomplete_settings(), FakeDrive::empty());
        let router = build_router(state.clone(), 16);
        let call = |router: Router| async move {
            let resp = router
                .oneshot(mcp_request(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                                             "params": {"name": "get_auth_status"}})))
                .await
                .unwrap();
            sse_json(resp).await
        };

        let before = call(router.clone()).await;
        connect(&state, "t1", Some("r1"));
        let after = call(router).await;

        assert_eq!(before["result"]["structuredContent"]["authenticated"], false);
        assert_eq!(after["result"]["structuredContent"]["authenticated"], true);
    }
}
