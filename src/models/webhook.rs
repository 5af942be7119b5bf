use serde::Deserialize;

/// Inbound webhook payload. Twilio posts `From`/`Body`/`MessageSid`; the
/// aliases keep lowercase variants from other providers working. The full
/// raw JSON is snapshotted separately onto the transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(alias = "From", default)]
    pub from: String,
    #[serde(alias = "Body", default)]
    pub body: String,
    #[serde(alias = "MessageSid")]
    pub message_sid: Option<String>,
}
