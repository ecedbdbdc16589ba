//! Webhook endpoint handlers.
//!
//! The notify handler walks one request through the full pipeline:
//! body parse → signature verification → topic authorization → dispatch on
//! message type. Outbound CRM work only happens for actionable
//! notifications; every response is a structured acknowledgment.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::mautic::{MauticClient, MauticConfigError};
use crate::process::apply_suppressions;
use crate::sns::envelope::{
    Envelope, MESSAGE_TYPE_HEADER, TYPE_NOTIFICATION, TYPE_SUBSCRIPTION_CONFIRMATION,
};
use crate::sns::{parse_delivery_event, ParsedEvent, SignatureVerifier};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub mautic: MauticClient,
    pub verifier: SignatureVerifier,
    /// Client for certificate fetches and subscription callbacks
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, MauticConfigError> {
        let mautic = MauticClient::new(&config)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            mautic,
            verifier: SignatureVerifier::new(http.clone()),
            http,
        })
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// SNS Notification Webhook
// =============================================================================

/// Structured acknowledgment for accepted envelopes.
#[derive(Serialize)]
pub struct NotifyAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<usize>,
}

impl NotifyAck {
    fn subscribed() -> Self {
        Self {
            ok: true,
            action: Some("subscribed"),
            ignored: None,
            processed: None,
        }
    }

    fn ignored(kind: Option<&str>) -> Self {
        Self {
            ok: true,
            action: None,
            ignored: Some(kind.unwrap_or("unknown").to_string()),
            processed: None,
        }
    }

    fn processed(count: usize) -> Self {
        Self {
            ok: true,
            action: None,
            ignored: None,
            processed: Some(count),
        }
    }
}

/// Rejection body for request-fatal failures.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: &'static str,
}

fn reject(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorResponse { ok: false, error })).into_response()
}

/// SNS notification endpoint.
///
/// SNS posts JSON with a text/plain content type, so the body arrives as
/// raw text here.
pub async fn sns_notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    info!(body_length = body.len(), "sns_notify_received");

    let envelope: Envelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "sns_body_invalid_json");
            return reject(StatusCode::BAD_REQUEST, "invalid JSON body");
        }
    };

    let header_hint = headers
        .get(MESSAGE_TYPE_HEADER)
        .and_then(|v| v.to_str().ok());
    let kind = envelope.effective_type(header_hint);

    if state.config.verify_signatures {
        if let Err(e) = state
            .verifier
            .verify(&envelope, kind.unwrap_or_default())
            .await
        {
            warn!(error = %e, topic_arn = ?envelope.topic_arn, "sns_signature_invalid");
            return reject(StatusCode::BAD_REQUEST, "invalid SNS signature");
        }
    }

    if !state.config.is_topic_allowed(envelope.topic_arn.as_deref()) {
        warn!(topic_arn = ?envelope.topic_arn, "sns_topic_not_allowed");
        return reject(StatusCode::FORBIDDEN, "forbidden topic");
    }

    match kind {
        Some(TYPE_SUBSCRIPTION_CONFIRMATION) => confirm_subscription(&state, &envelope).await,
        Some(TYPE_NOTIFICATION) => handle_notification(&state, &envelope).await,
        other => {
            info!(message_type = ?other, "sns_message_type_ignored");
            (StatusCode::OK, Json(NotifyAck::ignored(other))).into_response()
        }
    }
}

/// Complete the SNS subscription handshake by fetching the callback URL.
async fn confirm_subscription(state: &AppState, envelope: &Envelope) -> Response {
    let subscribe_url = match envelope.subscribe_url.as_deref() {
        Some(url) => url,
        None => {
            warn!(topic_arn = ?envelope.topic_arn, "sns_subscribe_url_missing");
            return reject(StatusCode::BAD_REQUEST, "missing SubscribeURL");
        }
    };

    match state.http.get(subscribe_url).send().await {
        Ok(resp) => {
            info!(
                topic_arn = ?envelope.topic_arn,
                status = resp.status().as_u16(),
                "sns_subscription_confirmed"
            );
            (StatusCode::OK, Json(NotifyAck::subscribed())).into_response()
        }
        Err(e) => {
            error!(error = %e, topic_arn = ?envelope.topic_arn, "sns_subscription_confirm_failed");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to confirm subscription",
            )
        }
    }
}

/// Parse the SES event and run the suppression pipeline.
async fn handle_notification(state: &AppState, envelope: &Envelope) -> Response {
    let payload = envelope.message.as_deref().unwrap_or("{}");

    let parsed = match parse_delivery_event(payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "ses_event_invalid_json");
            return reject(StatusCode::BAD_REQUEST, "invalid SES event JSON");
        }
    };

    let order = match parsed {
        ParsedEvent::Ignored { kind } => {
            info!(event_kind = ?kind, "ses_event_ignored");
            return (StatusCode::OK, Json(NotifyAck::ignored(kind.as_deref()))).into_response();
        }
        ParsedEvent::Actionable(order) => order,
    };

    if order.emails.is_empty() {
        info!("ses_event_no_recipients");
        return (StatusCode::OK, Json(NotifyAck::processed(0))).into_response();
    }

    let summary = apply_suppressions(&state.mautic, &state.config, &order).await;

    (
        StatusCode::OK,
        Json(NotifyAck::processed(summary.processed)),
    )
        .into_response()
}
