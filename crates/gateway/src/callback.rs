//! `POST /callback`: the LINE webhook endpoint.

use std::sync::Arc;

use {
    axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    },
    secrecy::ExposeSecret,
    tracing::{debug, warn},
};

use digitbot_line::{SIGNATURE_HEADER, WebhookPayload, verify_signature};

use crate::{pipeline, state::GatewayState};

/// Verify the request signature, then process each event in order.
///
/// The signature is checked against the raw body bytes before anything is
/// parsed. Processing errors never fail the request: users get the failure
/// reply and LINE gets `200 OK`, so it does not redeliver.
pub async fn callback_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("webhook request without signature header");
        return (StatusCode::BAD_REQUEST, "missing signature").into_response();
    };

    if !verify_signature(&body, signature, state.channel_secret.expose_secret()) {
        warn!(bytes = body.len(), "webhook signature mismatch");
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    }

    debug!(body = %String::from_utf8_lossy(&body), "webhook body");

    let payload = match WebhookPayload::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return (StatusCode::BAD_REQUEST, "invalid payload").into_response();
        },
    };

    let count = payload.events.len();
    for event in payload.events {
        let outcome = pipeline::handle_event(&state, event).await;
        debug!(?outcome, "event handled");
    }
    debug!(events = count, "webhook processed");

    (StatusCode::OK, "OK").into_response()
}
