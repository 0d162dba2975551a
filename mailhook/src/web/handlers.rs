//! HTTP endpoint handlers.
//!
//! The email webhook runs the whole pipeline inline for each request:
//! 1. Verify the body signature (when a key is configured)
//! 2. Parse and normalize the JSON payload
//! 3. Compose the RFC 822 message
//! 4. Hand it to the delivery backend and report the outcome

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::delivery::{Backend, DeliveryError};
use crate::mime::compose;
use crate::payload::{normalize, WebhookPayload};
use crate::web::signature::{
    is_signature_verification_enabled, verify_webhook_signature, SIGNATURE_HEADER,
};
use crate::Config;

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "forwardemail-webhook";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }
}

// =============================================================================
// Home Page
// =============================================================================

/// Informational landing page.
pub async fn home(State(state): State<AppState>) -> Html<String> {
    let config = &state.config;
    let webhook_url = format!("https://{}{}/webhook/email", config.domain, config.path_prefix);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>ForwardEmail Webhook</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; color: #333; }}
        .info {{ background: #f5f7fa; padding: 20px; border-radius: 5px; margin: 20px 0; }}
        .label {{ font-weight: bold; color: #667eea; }}
        .endpoint {{ background: #e8f5e9; padding: 15px; border-radius: 5px; border-left: 4px solid #4caf50; }}
        code {{ background: #f5f7fa; padding: 2px 6px; border-radius: 3px; }}
    </style>
</head>
<body>
    <h1>ForwardEmail Webhook Handler</h1>
    <p>This service receives emails from ForwardEmail.net and delivers them to the local mail transfer agent.</p>
    <div class="info">
        <div><span class="label">Domain:</span> {domain}</div>
        <div><span class="label">Path:</span> {prefix}</div>
        <div><span class="label">Backend:</span> {backend}</div>
        <div><span class="label">Server Time:</span> {now}</div>
    </div>
    <h2>Webhook Endpoint</h2>
    <div class="endpoint"><strong>POST</strong> <code>{webhook_url}</code></div>
    <p>Configure this URL in your ForwardEmail.net settings to receive incoming emails.</p>
    <h2>Available Endpoints</h2>
    <ul>
        <li><code>{prefix}/health</code> - Health check endpoint</li>
        <li><code>{prefix}/webhook/email</code> - Email webhook receiver (POST only)</li>
    </ul>
</body>
</html>"#,
        domain = escape_html(&config.domain),
        prefix = escape_html(&config.path_prefix),
        backend = state.backend.name(),
        now = Utc::now().to_rfc2822(),
        webhook_url = escape_html(&webhook_url),
    ))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        service: SERVICE_NAME,
    })
}

// =============================================================================
// Email Webhook
// =============================================================================

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub message: &'static str,
}

fn reply(
    code: StatusCode,
    status: &'static str,
    message: &'static str,
) -> (StatusCode, Json<WebhookResponse>) {
    (code, Json(WebhookResponse { status, message }))
}

/// Email webhook endpoint.
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what was sent, before any parsing.
pub async fn email_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        content_type = ?headers.get(CONTENT_TYPE),
        "webhook_received"
    );

    // Verify signature if a webhook key is configured
    if is_signature_verification_enabled(&state.config.webhook_key) {
        let key = state.config.webhook_key.as_deref().unwrap_or_default();
        match signature {
            None => {
                warn!("webhook_signature_missing");
                return reply(StatusCode::UNAUTHORIZED, "unauthorized", "missing signature");
            }
            Some(signature) if !verify_webhook_signature(&body, signature, key) => {
                warn!("webhook_signature_invalid");
                return reply(StatusCode::UNAUTHORIZED, "unauthorized", "invalid signature");
            }
            Some(_) => {}
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, body_length = body.len(), "webhook_payload_invalid");
            return reply(StatusCode::BAD_REQUEST, "error", "invalid JSON payload");
        }
    };

    let intent = match normalize(payload) {
        Ok(intent) => intent,
        Err(e) => {
            warn!(error = %e, "webhook_missing_fields");
            return reply(StatusCode::BAD_REQUEST, "error", "missing required fields");
        }
    };

    let message = compose(&intent);

    info!(
        from = %intent.from().address,
        to = %intent.to(),
        message_length = message.len(),
        backend = state.backend.name(),
        "email_composed"
    );

    let timeout = state.config.delivery_timeout;
    let delivered = tokio::time::timeout(
        timeout,
        state
            .backend
            .deliver(&intent.from().address, intent.to(), &message),
    )
    .await
    .unwrap_or_else(|_| Err(DeliveryError::Timeout(timeout.as_secs())));

    if let Err(e) = delivered {
        error!(
            to = %intent.to(),
            backend = state.backend.name(),
            error = %e,
            "delivery_failed"
        );
        return reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "error",
            "error processing email",
        );
    }

    info!(to = %intent.to(), backend = state.backend.name(), "email_delivered");

    reply(StatusCode::OK, "success", "Email delivered")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">&</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_webhook_response_shape() {
        let (code, Json(body)) = reply(StatusCode::OK, "success", "Email delivered");

        assert_eq!(code, StatusCode::OK);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"status":"success","message":"Email delivered"}"#
        );
    }
}
