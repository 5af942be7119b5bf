use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        customer::Customer,
        slot::ParkingSlot,
        transaction::Direction,
        webhook::WebhookPayload,
    },
    services::{
        metrics,
        notifications::{NotificationLogService, WhatsAppService},
        transactions::TransactionService,
    },
};

/// One inbound message parsed against the grammar
/// `<command> - <plate> - <slot-id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkCommand {
    pub command: String,
    pub plate_number: String,
    pub slot_id: Uuid,
}

/// Per-field parse failures; each names the segment that was wrong.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("message body is empty")]
    EmptyBody,
    #[error("plate number segment is missing")]
    MissingPlate,
    #[error("slot identifier segment is missing")]
    MissingSlot,
    #[error("slot identifier is not a valid token: {0}")]
    InvalidSlotId(String),
}

/// Parse a message body of the form `Park my car - GJ01AB1234 - <slot-id>`.
/// Segments are hyphen-delimited and trimmed; ordering is fixed. The slot
/// segment takes the remainder of the body, so the hyphens inside a UUID
/// survive the split.
pub fn parse_message(body: &str) -> Result<ParkCommand, ParseError> {
    let parts: Vec<&str> = body.splitn(3, '-').map(str::trim).collect();

    let command = match parts.first() {
        Some(c) if !c.is_empty() => c.to_lowercase(),
        _ => return Err(ParseError::EmptyBody),
    };
    let plate = match parts.get(1) {
        Some(p) if !p.is_empty() => (*p).to_string(),
        _ => return Err(ParseError::MissingPlate),
    };
    let slot_raw = match parts.get(2) {
        Some(s) if !s.is_empty() => *s,
        _ => return Err(ParseError::MissingSlot),
    };
    let slot_id = slot_raw
        .parse::<Uuid>()
        .map_err(|_| ParseError::InvalidSlotId(slot_raw.to_string()))?;

    Ok(ParkCommand {
        command,
        plate_number: plate,
        slot_id,
    })
}

/// Strip the provider channel prefix from the sender field.
pub fn extract_phone(from: &str) -> &str {
    from.strip_prefix("whatsapp:").unwrap_or(from).trim()
}

pub struct WebhookService;

impl WebhookService {
    /// Dispatch one inbound message. Never returns an error to the caller:
    /// the webhook must always acknowledge with 200 so the provider does not
    /// retry-storm us. Failures are logged for diagnosis and, where the
    /// customer can act on them, answered with an outbound notice.
    pub async fn handle_incoming(
        pool: &PgPool,
        whatsapp: &WhatsAppService,
        raw: serde_json::Value,
    ) {
        metrics::WEBHOOK_MESSAGES_COUNTER
            .with_label_values(&["received"])
            .inc();

        let payload: WebhookPayload = match serde_json::from_value(raw.clone()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("webhook payload not decodable: {e}");
                metrics::WEBHOOK_MESSAGES_COUNTER
                    .with_label_values(&["rejected"])
                    .inc();
                return;
            }
        };

        let phone = extract_phone(&payload.from);
        if phone.is_empty() {
            tracing::warn!("webhook payload has no sender");
            metrics::WEBHOOK_MESSAGES_COUNTER
                .with_label_values(&["rejected"])
                .inc();
            return;
        }

        let parsed = match parse_message(payload.body.trim()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("unparseable message from {phone}: {e}");
                metrics::WEBHOOK_MESSAGES_COUNTER
                    .with_label_values(&["rejected"])
                    .inc();
                return;
            }
        };

        if let Err(e) = Self::process_park_request(pool, whatsapp, phone, &parsed, &raw, payload.message_sid.as_deref()).await {
            // Internal failure after parsing: log it, still 200 upstream.
            tracing::error!("webhook processing failed for {phone}: {e}");
            metrics::WEBHOOK_MESSAGES_COUNTER
                .with_label_values(&["failed"])
                .inc();
        }
    }

    async fn process_park_request(
        pool: &PgPool,
        whatsapp: &WhatsAppService,
        phone: &str,
        parsed: &ParkCommand,
        raw: &serde_json::Value,
        message_sid: Option<&str>,
    ) -> Result<(), AppError> {
        let customer = Self::get_or_create_customer(pool, phone).await?;

        let slot = sqlx::query_as::<_, ParkingSlot>(
            "SELECT * FROM parking_slots WHERE id = $1",
        )
        .bind(parsed.slot_id)
        .fetch_optional(pool)
        .await?;

        let Some(slot) = slot else {
            whatsapp
                .send(phone, "Invalid slot. Please scan a valid QR code.")
                .await;
            metrics::WEBHOOK_MESSAGES_COUNTER
                .with_label_values(&["invalid_slot"])
                .inc();
            return Ok(());
        };

        let (transaction, slot) = match TransactionService::request_park(
            pool,
            customer.id,
            slot.id,
            &parsed.plate_number,
            raw,
        )
        .await
        {
            Ok(pair) => pair,
            Err(AppError::SlotUnavailable(_)) => {
                whatsapp
                    .send(
                        phone,
                        "Sorry, that slot is currently occupied. Please try another slot.",
                    )
                    .await;
                metrics::WEBHOOK_MESSAGES_COUNTER
                    .with_label_values(&["slot_occupied"])
                    .inc();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        metrics::TRANSACTIONS_CREATED_COUNTER.inc();

        NotificationLogService::record_soft(
            pool,
            transaction.id,
            Direction::Incoming,
            message_sid,
            raw,
        )
        .await;

        let ack_text = format!(
            "Received your request to park car {} in slot {}. Your ticket code is {}. Please wait for confirmation.",
            parsed.plate_number,
            slot.name,
            transaction.ticket_code.as_deref().unwrap_or("-"),
        );
        let outbound_sid = whatsapp.send(phone, &ack_text).await;
        if outbound_sid.is_none() && whatsapp.is_configured() {
            metrics::WHATSAPP_SEND_FAILURES_COUNTER.inc();
        }

        NotificationLogService::record_soft(
            pool,
            transaction.id,
            Direction::Outgoing,
            outbound_sid.as_deref(),
            &serde_json::json!({ "to": phone, "body": ack_text }),
        )
        .await;

        metrics::WEBHOOK_MESSAGES_COUNTER
            .with_label_values(&["parked_request"])
            .inc();
        Ok(())
    }

    /// Idempotent get-or-create keyed by the unique phone number.
    async fn get_or_create_customer(pool: &PgPool, phone: &str) -> Result<Customer, AppError> {
        let inserted = sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (phone_number)
             VALUES ($1)
             ON CONFLICT (phone_number) DO NOTHING
             RETURNING *",
        )
        .bind(phone)
        .fetch_optional(pool)
        .await?;

        if let Some(customer) = inserted {
            return Ok(customer);
        }

        let existing = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE phone_number = $1",
        )
        .bind(phone)
        .fetch_one(pool)
        .await?;
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLOT: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn parses_the_canonical_park_message() {
        let cmd = parse_message(&format!("Park my car - GJ01AB1234 - {SLOT}")).unwrap();
        assert_eq!(cmd.command, "park my car");
        assert_eq!(cmd.plate_number, "GJ01AB1234");
        assert_eq!(cmd.slot_id, SLOT.parse::<Uuid>().unwrap());
    }

    #[test]
    fn segments_are_trimmed() {
        let cmd = parse_message(&format!("  Park my car -   GJ01AB1234-{SLOT} ")).unwrap();
        assert_eq!(cmd.plate_number, "GJ01AB1234");
    }

    #[test]
    fn empty_body_is_rejected() {
        assert_eq!(parse_message(""), Err(ParseError::EmptyBody));
        assert_eq!(parse_message("   "), Err(ParseError::EmptyBody));
    }

    #[test]
    fn missing_plate_is_rejected() {
        assert_eq!(parse_message("Park my car"), Err(ParseError::MissingPlate));
        assert_eq!(parse_message("Park my car - "), Err(ParseError::MissingPlate));
    }

    #[test]
    fn missing_slot_is_rejected() {
        assert_eq!(
            parse_message("Park my car - GJ01AB1234"),
            Err(ParseError::MissingSlot)
        );
    }

    #[test]
    fn slot_segment_keeps_its_internal_hyphens() {
        // A UUID contains hyphens; the third segment must take the remainder.
        let cmd = parse_message(&format!("Park my car - GJ01AB1234 - {SLOT}")).unwrap();
        assert_eq!(cmd.slot_id.to_string(), SLOT);
    }

    #[test]
    fn malformed_slot_id_names_the_bad_token() {
        match parse_message("Park my car - GJ01AB1234 - not a slot") {
            Err(ParseError::InvalidSlotId(s)) => assert_eq!(s, "not a slot"),
            other => panic!("expected InvalidSlotId, got {other:?}"),
        }
    }

    #[test]
    fn phone_prefix_is_stripped() {
        assert_eq!(extract_phone("whatsapp:+1234567890"), "+1234567890");
        assert_eq!(extract_phone("+1234567890"), "+1234567890");
    }
}
