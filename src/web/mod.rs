// Web server — Axum-based JSON API in front of the Scanner.
//
// POST /scan takes a multipart image upload and an optional method, and
// returns the common result. Every failure is reported as `{"error": ...}`
// with a non-2xx status. Credentials come from the server's own config, not
// from the request.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::dispatch::{Credentials, Scanner};
use crate::error::ScanError;

pub mod handlers;

/// Phone photos routinely exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<Scanner>,
    pub credentials: Arc<Credentials>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(config: Config, port: u16, bind: &str) -> Result<()> {
    let state = AppState {
        scanner: Arc::new(Scanner::from_config(&config)?),
        credentials: Arc::new(Credentials::from_config(&config)),
    };

    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("scanlens listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/scan", post(handlers::scan::scan_image))
        .route("/scan/legacy", post(handlers::scan::scan_image_legacy))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check — always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

/// HTTP status for each scan failure kind.
pub fn status_for(error: &ScanError) -> StatusCode {
    match error {
        ScanError::InvalidMethod(_) => StatusCode::BAD_REQUEST,
        ScanError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ScanError::Upload(_) | ScanError::Upstream(_) | ScanError::Automation(_) => {
            StatusCode::BAD_GATEWAY
        }
        ScanError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        api_error(status_for(&self), &self.to_string())
    }
}
