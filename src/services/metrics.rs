use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Gauge, GaugeVec,
};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref WEBHOOK_MESSAGES_COUNTER: CounterVec = register_counter_vec!(
        "api_webhook_messages_total",
        "Inbound WhatsApp messages by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref TRANSACTIONS_CREATED_COUNTER: Counter = register_counter!(
        "api_parking_transactions_created_total",
        "Parking transactions created via the webhook"
    ).unwrap();

    pub static ref STATUS_TRANSITIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_status_transitions_total",
        "Transaction status transitions by target status",
        &["to"]
    ).unwrap();

    pub static ref WHATSAPP_SEND_FAILURES_COUNTER: Counter = register_counter!(
        "api_whatsapp_send_failures_total",
        "Outbound WhatsApp messages the provider did not accept"
    ).unwrap();

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref SLOTS_GAUGE: GaugeVec = register_gauge_vec!(
        "valet_slots_total",
        "Parking slots per company and occupancy",
        &["company", "occupied"]
    ).unwrap();

    pub static ref OPEN_TRANSACTIONS_GAUGE: GaugeVec = register_gauge_vec!(
        "valet_open_transactions_total",
        "Non-delivered transactions per company and status",
        &["company", "status"]
    ).unwrap();

    pub static ref COMPANIES_GAUGE: Gauge = register_gauge!(
        "valet_companies_total",
        "Number of registered companies"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        // Initial collection on startup
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let companies: Vec<(String,)> = sqlx::query_as("SELECT company_code FROM companies")
        .fetch_all(pool)
        .await?;

    COMPANIES_GAUGE.set(companies.len() as f64);

    let slot_counts: Vec<(String, bool, i64)> = sqlx::query_as(
        "SELECT c.company_code, s.is_occupied, COUNT(*)::BIGINT
         FROM parking_slots s
         JOIN companies c ON c.id = s.company_id
         WHERE s.is_active = TRUE
         GROUP BY c.company_code, s.is_occupied",
    )
    .fetch_all(pool)
    .await
    .unwrap_or_default();

    for (company, occupied, count) in slot_counts {
        SLOTS_GAUGE
            .with_label_values(&[&company, if occupied { "true" } else { "false" }])
            .set(count as f64);
    }

    let open_counts: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT c.company_code, t.status, COUNT(*)::BIGINT
         FROM parking_transactions t
         JOIN parking_slots s ON s.id = t.slot_id
         JOIN companies c ON c.id = s.company_id
         WHERE t.status != 'delivered'
         GROUP BY c.company_code, t.status",
    )
    .fetch_all(pool)
    .await
    .unwrap_or_default();

    for (company, status, count) in open_counts {
        OPEN_TRANSACTIONS_GAUGE
            .with_label_values(&[&company, &status])
            .set(count as f64);
    }

    info!("Metrics: collected for {} company(ies)", companies.len());
    Ok(())
}
