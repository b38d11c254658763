use crate::server::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use intake_channels::TelegramUpdate;
use std::sync::Arc;
use tracing::{debug, warn};

/// Header Telegram uses to echo the `secret_token` given to `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Checks the `X-Telegram-Bot-Api-Secret-Token` value against the
/// configured secret.
///
/// Equal-length inputs are compared in full whatever the first mismatch,
/// so response timing does not reveal a matching prefix. The length itself
/// is not hidden.
pub fn validate_secret(config_secret: &str, request_secret: &str) -> bool {
    let (expected, given) = (config_secret.as_bytes(), request_secret.as_bytes());
    expected.len() == given.len()
        && expected
            .iter()
            .zip(given)
            .fold(0u8, |diff, (x, y)| diff | (x ^ y))
            == 0
}

/// Axum handler for Telegram webhook deliveries.
///
/// Route: `POST /telegram/webhook`
///
/// Checks the secret header if one is configured, decodes the update and
/// queues it on the sender's lane. The update is acknowledged before it is
/// processed; updates that carry nothing the form understands are
/// acknowledged and dropped.
pub async fn telegram_webhook(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: String,
) -> impl IntoResponse {
    if let Some(ref secret) = state.webhook_secret {
        let request_secret = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !validate_secret(secret, request_secret) {
            warn!("Webhook secret validation failed");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"ok": false, "error": "invalid secret"})),
            );
        }
    }

    let update: TelegramUpdate = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Malformed webhook update");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"ok": false, "error": "malformed update"})),
            );
        }
    };

    let update_id = update.update_id;
    match update.into_event() {
        Some(event) => {
            debug!(
                update_id,
                session_id = %event.session_id,
                kind = event.payload.kind(),
                "Webhook update queued"
            );
            state.lanes.submit(event);
        }
        None => debug!(update_id, "Ignoring unsupported Telegram update"),
    }

    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}
