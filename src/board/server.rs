use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::db::{BoardDb, DbHandle};
use super::embedded::Assets;
use super::ws;
use crate::config::TaskboardConfig;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: u16,
    pub db_path: std::path::PathBuf,
    pub cors_origin: String,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 9000,
            db_path: std::path::PathBuf::from(".taskboard/taskboard.db"),
            cors_origin: "http://localhost:3000".to_string(),
            dev_mode: false,
        }
    }
}

impl From<&TaskboardConfig> for ServerConfig {
    fn from(config: &TaskboardConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            db_path: config.database.path.clone(),
            cors_origin: config.server.cors_origin.clone(),
            dev_mode: config.server.dev_mode,
        }
    }
}

impl ServerConfig {
    /// Address to bind. Dev mode listens on every interface unless a host
    /// is set explicitly.
    pub fn bind_addr(&self) -> String {
        let host = match &self.host {
            Some(host) => host.as_str(),
            None if self.dev_mode => "0.0.0.0",
            None => "127.0.0.1",
        };
        format!("{}:{}", host, self.port)
    }

    fn cors_layer(&self) -> Result<CorsLayer> {
        if self.dev_mode {
            return Ok(CorsLayer::permissive());
        }
        let origin = HeaderValue::from_str(&self.cors_origin)
            .with_context(|| format!("Invalid CORS origin '{}'", self.cors_origin))?;
        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true))
    }
}

/// Build the full application router with API, WebSocket, and SPA serving.
pub fn build_router(state: Arc<AppState>) -> Router {
    let events_tx = state.events_tx.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::ws_handler(ws_upgrade, events_tx)),
        )
        .fallback(static_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve embedded static files or fall back to index.html for SPA routing.
async fn static_handler(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty() {
        if let Some(content) = Assets::get(path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response();
        }
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).to_string()).into_response(),
        None => (StatusCode::NOT_FOUND, "Board UI not found.").into_response(),
    }
}

/// Open the database at `path`, creating its parent directory first.
pub fn open_database(path: &std::path::Path) -> Result<BoardDb> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }
    BoardDb::new(path).context("Failed to initialize board database")
}

/// Start the board server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let db = open_database(&config.db_path)?;
    let (events_tx, _rx) = broadcast::channel::<String>(256);

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        events_tx,
    });

    let app = build_router(state).layer(config.cors_layer()?);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        address = %local_addr,
        db = %config.db_path.display(),
        dev_mode = config.dev_mode,
        "taskboard listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
