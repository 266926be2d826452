//! Google Drive MCP gateway
//!
//! Single-user service that:
//! 1. Walks the owner through Google's OAuth consent (`/auth`, `/oauth2callback`)
//! 2. Keeps the resulting credential in memory
//! 3. Exposes read-only Drive metadata tools to agents over MCP (`/mcp`)

mod config;
mod error;
mod handlers;
mod mcp;
mod metrics;
mod router;
#[cfg(test)]
mod test_support;
mod tools;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use drive_client::{DriveApi, GoogleDriveClient};
use google_auth::{AuthorizationFlow, CredentialStore, InMemoryCredentialStore};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::router::Dispatcher;
use crate::tools::DriveTools;

/// Time allowed for in-flight requests after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    flow: Arc<AuthorizationFlow>,
    tools: Arc<DriveTools>,
    started_at: Instant,
}

/// Build the main router.
///
/// Every request goes through `router::dispatch`, which picks the plain
/// handlers or the MCP facade. The concurrency limit covers both surfaces.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let tools = mcp::tool_router(state.tools.clone());
    let dispatcher = Dispatcher::new(handlers::plain_router(state), tools);
    Router::new()
        .fallback(router::dispatch)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(dispatcher)
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; a missing file is not an error
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(dotenv = ?dotenv_path, "starting drive-gateway");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!("no config file, using environment only"),
    }

    let config = Config::load(config_path.as_deref()).context("failed to load config")?;
    let settings = config.oauth_settings();

    info!(
        listen_addr = %config.server.listen_addr,
        owner = %config.oauth.owner_email,
        oauth_configured = settings.is_complete(),
        metrics_addr = ?config.server.metrics_addr,
        "configuration loaded"
    );
    if let Err(e) = settings.client_credentials() {
        warn!(error = %e, "OAuth client incomplete, /auth will fail until it is configured");
    }

    if let Some(metrics_addr) = config.server.metrics_addr {
        let handle = metrics::install_recorder()?;
        let listener = TcpListener::bind(metrics_addr)
            .await
            .with_context(|| format!("failed to bind metrics listener to {metrics_addr}"))?;
        info!(addr = %metrics_addr, "metrics listener ready");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics::metrics_router(handle)).await {
                error!(error = %e, "metrics listener failed");
            }
        });
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("drive-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
    let flow = Arc::new(AuthorizationFlow::new(
        settings,
        config.oauth.owner_email.clone(),
        store,
        http.clone(),
    ));
    let drive: Arc<dyn DriveApi> = Arc::new(GoogleDriveClient::new(
        http,
        config.drive.api_base.clone(),
        Duration::from_secs(config.drive.timeout_secs),
    ));
    let state = AppState {
        tools: Arc::new(DriveTools::new(flow.clone(), drive)),
        flow,
        started_at: Instant::now(),
    };

    let app = build_router(state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timer starts at signal receipt, not at server start
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
