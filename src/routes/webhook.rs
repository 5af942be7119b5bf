use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    middleware::rate_limit::check_rate_limit,
    services::webhook::{extract_phone, WebhookService},
    AppState,
};

/// Inbound WhatsApp webhook. Always answers 200: a failure status would make
/// the provider retry-storm us, and the customer-facing outcome is already
/// handled with outbound notices. Diagnostics go to the logs.
pub async fn receive_message(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    // Per-sender rate limit; a redis failure never blocks the webhook.
    if let Some(from) = payload.get("From").and_then(|v| v.as_str()) {
        let phone = extract_phone(from);
        if !phone.is_empty() {
            let mut redis = state.redis.clone();
            let rate_key = format!("rate:webhook:{phone}");
            if check_rate_limit(&mut redis, &rate_key, 30, 60).await.is_err() {
                tracing::warn!("webhook rate limit hit for {phone}");
                return (StatusCode::OK, Json(json!({ "status": "ok" })));
            }
        }
    }

    WebhookService::handle_incoming(&state.db, &state.whatsapp, payload).await;
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
