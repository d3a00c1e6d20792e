//! HTTP routes for the screenshot service
//!
//! ```text
//! GET /                 usage line
//! GET /health           backend liveness (launches and closes a browser)
//! GET /screenshot?url=  full-page PNG
//! *                     404 Not Found
//! ```

use crate::acquisition::{Acquirer, AcquisitionResult};
use crate::error::AcquisitionError;
use crate::cors::cors_layer;
use axum::extract::{Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, error, info, instrument};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    acquirer: Arc<dyn Acquirer>,
}

impl AppState {
    /// State over any acquirer
    pub fn new(acquirer: Arc<dyn Acquirer>) -> Self {
        Self { acquirer }
    }
}

/// Query string of `GET /screenshot`
#[derive(Debug, Deserialize)]
pub struct ScreenshotQuery {
    /// Page to capture
    pub url: Option<String>,
}

/// Build the service router with CORS, request logging and panic recovery
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/screenshot", get(screenshot_handler))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(log_requests))
        .layer(cors_layer())
}

async fn root_handler() -> &'static str {
    "Screenshot service is running. Use GET /screenshot?url=<url> to capture a page."
}

/// `GET /health`
#[instrument(skip_all)]
pub async fn health_handler(State(state): State<AppState>) -> Response {
    debug!("Health check requested");
    match state.acquirer.health().await {
        Ok(message) => (StatusCode::OK, message).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "Service is running but the browser backend failed: {}",
                e.message
            ),
        )
            .into_response(),
    }
}

/// `GET /screenshot?url=`
#[instrument(skip_all)]
pub async fn screenshot_handler(
    State(state): State<AppState>,
    Query(query): Query<ScreenshotQuery>,
) -> Response {
    let url = match query.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => return (StatusCode::BAD_REQUEST, "URL parameter required").into_response(),
    };

    match detached_acquire(Arc::clone(&state.acquirer), url.to_string()).await {
        Ok(png) => {
            info!("Screenshot generated for {} ({} bytes)", url, png.len());
            ([(header::CONTENT_TYPE, "image/png")], png).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to generate screenshot: {}", e.message),
        )
            .into_response(),
    }
}

/// Capture on its own task; a client disconnect does not cancel it.
/// Panics are re-raised on the handler task.
async fn detached_acquire(acquirer: Arc<dyn Acquirer>, url: String) -> AcquisitionResult<Vec<u8>> {
    match tokio::spawn(async move { acquirer.acquire(&url).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(AcquisitionError::unavailable(format!(
            "Capture task cancelled: {}",
            e
        ))),
    }
}

async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("Handler panicked: {}", detail);

    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
