use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a parking request:
/// pending_park → parked → pending_retrieve → delivered (terminal).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    PendingPark,
    Parked,
    PendingRetrieve,
    Delivered,
}

impl TransactionStatus {
    /// The single legal successor of each state, if any.
    pub fn next(self) -> Option<TransactionStatus> {
        match self {
            TransactionStatus::PendingPark => Some(TransactionStatus::Parked),
            TransactionStatus::Parked => Some(TransactionStatus::PendingRetrieve),
            TransactionStatus::PendingRetrieve => Some(TransactionStatus::Delivered),
            TransactionStatus::Delivered => None,
        }
    }

    /// Strict transition check: only the immediate successor is allowed.
    /// No backward moves, no skipping, nothing out of DELIVERED.
    pub fn can_transition_to(self, target: TransactionStatus) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::PendingPark => "pending_park",
            TransactionStatus::Parked => "parked",
            TransactionStatus::PendingRetrieve => "pending_retrieve",
            TransactionStatus::Delivered => "delivered",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_park" => Ok(TransactionStatus::PendingPark),
            "parked" => Ok(TransactionStatus::Parked),
            "pending_retrieve" => Ok(TransactionStatus::PendingRetrieve),
            "delivered" => Ok(TransactionStatus::Delivered),
            _ => Err(anyhow::anyhow!("Unknown status: {s}")),
        }
    }
}

/// DB row struct — status is stored as TEXT with a CHECK constraint.
/// There is no company column: ownership is derived through slot.company_id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParkingTransaction {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub slot_id: Uuid,
    pub employee_assigned_id: Option<Uuid>,
    pub plate_number: Option<String>,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub parked_at: Option<DateTime<Utc>>,
    pub retrieve_requested_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub raw_payload: Option<serde_json::Value>,
    pub ticket_code: Option<String>,
}

/// Direction of a logged WhatsApp message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationLog {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub direction: String,
    pub provider_message_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_display_and_from_str() {
        for status in [
            TransactionStatus::PendingPark,
            TransactionStatus::Parked,
            TransactionStatus::PendingRetrieve,
            TransactionStatus::Delivered,
        ] {
            let parsed: TransactionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("cancelled".parse::<TransactionStatus>().is_err());
        assert!("PARKED".parse::<TransactionStatus>().is_err());
        assert!("".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn forward_chain_is_the_only_legal_path() {
        use TransactionStatus::*;
        assert!(PendingPark.can_transition_to(Parked));
        assert!(Parked.can_transition_to(PendingRetrieve));
        assert!(PendingRetrieve.can_transition_to(Delivered));
    }

    #[test]
    fn skipping_states_is_rejected() {
        use TransactionStatus::*;
        assert!(!PendingPark.can_transition_to(PendingRetrieve));
        assert!(!PendingPark.can_transition_to(Delivered));
        assert!(!Parked.can_transition_to(Delivered));
    }

    #[test]
    fn backward_and_self_transitions_are_rejected() {
        use TransactionStatus::*;
        for from in [PendingPark, Parked, PendingRetrieve, Delivered] {
            assert!(!from.can_transition_to(from));
        }
        assert!(!Parked.can_transition_to(PendingPark));
        assert!(!PendingRetrieve.can_transition_to(Parked));
        assert!(!Delivered.can_transition_to(PendingRetrieve));
    }

    #[test]
    fn delivered_is_terminal() {
        use TransactionStatus::*;
        assert_eq!(Delivered.next(), None);
        for target in [PendingPark, Parked, PendingRetrieve, Delivered] {
            assert!(!Delivered.can_transition_to(target));
        }
    }
}
