//! Web server module.
//!
//! Routes, mounted under the configured path prefix:
//! - `GET  /`              informational page
//! - `GET  /health`        health check
//! - `POST /webhook/email` signed email webhook

pub mod handlers;
pub mod signature;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub use handlers::{
    email_webhook, health, home, AppState, HealthResponse, WebhookResponse, SERVICE_NAME,
};
pub use signature::{is_signature_verification_enabled, verify_webhook_signature, SIGNATURE_HEADER};

/// Build the application router for `state`.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let prefix = config.path_prefix.as_str();

    let mut app = Router::new()
        .route(&format!("{}/", prefix), get(home))
        .route(&format!("{}/health", prefix), get(health))
        .route(&format!("{}/webhook/email", prefix), post(email_webhook));

    if !prefix.is_empty() {
        app = app.route(prefix, get(home));
    }

    app.layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
