//! Demo data seed script
//!
//! Seeds a demo valet company with realistic data:
//! - Company: Skyline Valet (Demo) with its admin account
//! - 2 employee accounts
//! - 8 parking slots across two divisions
//! - 1 walked-through transaction (parked, awaiting retrieval)
//!
//! Usage:
//!   DATABASE_URL=... ./seed-demo [--slots N] [--wipe]
//!
//! Environment variables:
//!   DATABASE_URL   — PostgreSQL connection string (required)
//!   DEMO_PASSWORD  — Password for all demo accounts (default: Demo2024!)

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::env;
use uuid::Uuid;

use valetdesk_api::services::auth::generate_company_code;
use valetdesk_api::services::transactions::generate_ticket_code;

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed a demo valet company")]
struct Args {
    /// Number of parking slots to create
    #[arg(long, default_value_t = 8)]
    slots: u32,

    /// Delete an existing demo company first
    #[arg(long, default_value_t = false)]
    wipe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let demo_password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "Demo2024!".to_string());

    println!("=== Seed Demo Company ===");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    valetdesk_api::db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    if args.wipe {
        println!("Wiping existing demo company...");
        // Cascades take out slots, profiles and transactions.
        sqlx::query("DELETE FROM companies WHERE name = 'Skyline Valet (Demo)'")
            .execute(&pool)
            .await?;
        sqlx::query("DELETE FROM users WHERE username LIKE 'demo-%'")
            .execute(&pool)
            .await?;
    }

    // Hash password (cost 10 for seed speed)
    let password_hash =
        bcrypt::hash(&demo_password, 10).context("Failed to hash demo password")?;

    println!("Creating admin and company...");
    let admin_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash, first_name, last_name, role)
         VALUES ('demo-admin', 'admin@demo.valetdesk.app', $1, 'Asha', 'Mehta', 'company_admin')
         RETURNING id",
    )
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    let company_code = generate_company_code();
    let company_id: Uuid = sqlx::query_scalar(
        "INSERT INTO companies (name, phone_number, location, company_code, admin_user_id)
         VALUES ('Skyline Valet (Demo)', '+15550100', 'Ahmedabad', $1, $2)
         RETURNING id",
    )
    .bind(&company_code)
    .bind(admin_id)
    .fetch_one(&pool)
    .await?;

    println!("Creating employees...");
    let employees = [
        ("demo-ravi", "ravi@demo.valetdesk.app", "Ravi", "Patel", "+15550101"),
        ("demo-lena", "lena@demo.valetdesk.app", "Lena", "Shah", "+15550102"),
    ];
    let mut first_profile_id: Option<Uuid> = None;
    for (username, email, first, last, phone) in employees {
        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, 'employee')
             RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(first)
        .bind(last)
        .fetch_one(&pool)
        .await?;

        let profile_id: Uuid = sqlx::query_scalar(
            "INSERT INTO employee_profiles (user_id, company_id, phone_number)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(phone)
        .fetch_one(&pool)
        .await?;
        first_profile_id.get_or_insert(profile_id);
    }

    println!("Creating {} slots...", args.slots);
    let mut first_slot_id: Option<Uuid> = None;
    for i in 1..=args.slots {
        let division = if i <= args.slots / 2 { "Basement" } else { "Rooftop" };
        let slot_id: Uuid = sqlx::query_scalar(
            "INSERT INTO parking_slots (company_id, name, division)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(company_id)
        .bind(format!("S-{i:02}"))
        .bind(division)
        .fetch_one(&pool)
        .await?;
        first_slot_id.get_or_insert(slot_id);
    }

    // One transaction already parked in the first slot, so the dashboard has
    // something to show.
    println!("Creating a parked transaction...");
    let slot_id = first_slot_id.context("no slots created")?;
    let customer_id: Uuid = sqlx::query_scalar(
        "INSERT INTO customers (phone_number, name)
         VALUES ('+15550199', 'Demo Customer')
         ON CONFLICT (phone_number) DO UPDATE SET name = EXCLUDED.name
         RETURNING id",
    )
    .fetch_one(&pool)
    .await?;

    let tx_id: Uuid = sqlx::query_scalar(
        "INSERT INTO parking_transactions
             (customer_id, slot_id, employee_assigned_id, plate_number, status,
              parked_at, ticket_code)
         VALUES ($1, $2, $3, 'GJ01AB1234', 'parked', NOW(), $4)
         RETURNING id",
    )
    .bind(customer_id)
    .bind(slot_id)
    .bind(first_profile_id)
    .bind(generate_ticket_code())
    .fetch_one(&pool)
    .await?;

    sqlx::query("UPDATE parking_slots SET is_occupied = TRUE WHERE id = $1")
        .bind(slot_id)
        .execute(&pool)
        .await?;

    sqlx::query(
        "INSERT INTO notification_logs (transaction_id, direction, payload)
         VALUES ($1, 'incoming', $2)",
    )
    .bind(tx_id)
    .bind(serde_json::json!({
        "From": "whatsapp:+15550199",
        "Body": "Park my car - GJ01AB1234 - <slot-id>",
    }))
    .execute(&pool)
    .await?;

    println!("Done.");
    println!("  Company code: {company_code}");
    println!("  Admin login:  demo-admin / {demo_password}");
    Ok(())
}
