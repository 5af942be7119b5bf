use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A parking slot. The id doubles as the capability token embedded in the
/// QR code customers scan, so it must stay opaque and non-sequential.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkingSlot {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub division: String,
    pub is_active: bool,
    pub is_occupied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Occupancy is deliberately absent from both DTOs: only the transaction
// state machine may flip it.

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub name: String,
    pub division: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSlotRequest {
    pub name: Option<String>,
    pub division: Option<String>,
    pub is_active: Option<bool>,
}
