//! Prometheus metrics exposition
//!
//! - `gateway_requests_total` (counter): labels `surface`, `status`
//! - `gateway_request_duration_seconds` (histogram): label `surface`
//! - `gateway_token_exchanges_total` (counter): label `outcome`
//! - `gateway_tool_calls_total` (counter): labels `tool`, `outcome`
//!
//! Served on a separate listener so the main listener only answers the
//! plain and tool surfaces.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::router::Surface;

const DURATION_METRIC: &str = "gateway_request_duration_seconds";

/// From 5ms up to the 30s Drive timeout plus headroom
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
        .context("failed to set histogram buckets")
}

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Router for the metrics listener.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(handle)
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
        .into_response()
}

/// Record a dispatched request with its surface and response status.
pub fn record_request(surface: Surface, status: u16, duration_secs: f64) {
    metrics::counter!(
        "gateway_requests_total",
        "surface" => surface.label(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(DURATION_METRIC, "surface" => surface.label()).record(duration_secs);
}

/// Record the outcome of an authorization code exchange.
pub fn record_token_exchange(outcome: &'static str) {
    metrics::counter!("gateway_token_exchanges_total", "outcome" => outcome).increment(1);
}

/// Record one tool invocation.
pub fn record_tool_call(tool: &str, outcome: &'static str) {
    metrics::counter!(
        "gateway_tool_calls_total",
        "tool" => tool.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
