use reqwest::Client;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::transaction::{Direction, NotificationLog},
};

/// Outbound WhatsApp sender (Twilio Messages API). When credentials are not
/// configured the send becomes a no-op, so local development works without
/// an account. Failures are logged and swallowed: delivery is fire-and-forget
/// and must never roll back a committed state transition.
pub struct WhatsAppService {
    client: Client,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
}

impl WhatsAppService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_whatsapp_number.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }

    /// Send a message; returns the provider message id when the provider
    /// accepted it, None otherwise.
    pub async fn send(&self, to_phone: &str, text: &str) -> Option<String> {
        let (Some(sid), Some(token), Some(from)) = (
            self.account_sid.as_deref(),
            self.auth_token.as_deref(),
            self.from_number.as_deref(),
        ) else {
            tracing::debug!("WhatsApp sender not configured, skipping outbound message");
            return None;
        };

        let url = format!("https://api.twilio.com/2010-04-01/Accounts/{sid}/Messages.json");
        let params = [
            ("From", format!("whatsapp:{from}")),
            ("To", format!("whatsapp:{to_phone}")),
            ("Body", text.to_string()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&params)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("sid").and_then(|s| s.as_str()).map(String::from)),
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                tracing::warn!("WhatsApp send failed {status}: {text}");
                None
            }
            Err(e) => {
                tracing::warn!("WhatsApp send error: {e}");
                None
            }
        }
    }
}

/// Append-only audit trail of inbound/outbound messages per transaction.
/// Rows are never updated or deleted.
pub struct NotificationLogService;

impl NotificationLogService {
    pub async fn record(
        pool: &PgPool,
        transaction_id: Uuid,
        direction: Direction,
        provider_message_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<NotificationLog, AppError> {
        let log = sqlx::query_as::<_, NotificationLog>(
            "INSERT INTO notification_logs
                 (transaction_id, direction, provider_message_id, payload)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(transaction_id)
        .bind(direction.to_string())
        .bind(provider_message_id)
        .bind(payload)
        .fetch_one(pool)
        .await?;
        Ok(log)
    }

    /// Best-effort variant for paths that must not fail on logging.
    pub async fn record_soft(
        pool: &PgPool,
        transaction_id: Uuid,
        direction: Direction,
        provider_message_id: Option<&str>,
        payload: &serde_json::Value,
    ) {
        if let Err(e) =
            Self::record(pool, transaction_id, direction, provider_message_id, payload).await
        {
            tracing::warn!("notification log insert failed for tx {transaction_id}: {e}");
        }
    }
}
