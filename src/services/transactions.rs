use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        slot::ParkingSlot,
        transaction::{ParkingTransaction, TransactionStatus},
    },
    services::tenancy::CompanyScope,
};

const TICKET_CODE_LEN: usize = 6;
const TICKET_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Short code echoed back to the customer; ambiguous glyphs excluded.
pub fn generate_ticket_code() -> String {
    let mut rng = rand::thread_rng();
    (0..TICKET_CODE_LEN)
        .map(|_| TICKET_CODE_CHARSET[rng.gen_range(0..TICKET_CODE_CHARSET.len())] as char)
        .collect()
}

pub struct TransactionService;

impl TransactionService {
    /// Create a pending_park transaction for a slot.
    ///
    /// The slot row is locked for the duration, so two concurrent park
    /// requests serialize and exactly one wins. A slot is available when it
    /// is active, unoccupied, and has no open (non-delivered) transaction;
    /// anything else is SlotUnavailable and nothing is written.
    pub async fn request_park(
        pool: &PgPool,
        customer_id: Uuid,
        slot_id: Uuid,
        plate_number: &str,
        raw_payload: &serde_json::Value,
    ) -> Result<(ParkingTransaction, ParkingSlot), AppError> {
        let mut tx = pool.begin().await?;

        let slot = Self::lock_slot(&mut tx, slot_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Slot not found".into()))?;

        if !slot.is_active {
            return Err(AppError::SlotUnavailable("Slot is not active".into()));
        }
        if slot.is_occupied {
            return Err(AppError::SlotUnavailable("Slot is occupied".into()));
        }

        let open_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM parking_transactions
                 WHERE slot_id = $1 AND status != 'delivered'
             )",
        )
        .bind(slot_id)
        .fetch_one(&mut *tx)
        .await?;
        if open_exists {
            return Err(AppError::SlotUnavailable(
                "Slot already has a pending request".into(),
            ));
        }

        let transaction = sqlx::query_as::<_, ParkingTransaction>(
            "INSERT INTO parking_transactions
                 (customer_id, slot_id, plate_number, status, raw_payload, ticket_code)
             VALUES ($1, $2, $3, 'pending_park', $4, $5)
             RETURNING *",
        )
        .bind(customer_id)
        .bind(slot_id)
        .bind(plate_number)
        .bind(raw_payload)
        .bind(generate_ticket_code())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((transaction, slot))
    }

    /// Apply one status transition, atomically with its occupancy side
    /// effect. The slot row is locked first (same order as request_park),
    /// then the transaction row; the pair commits or rolls back together.
    ///
    /// Company scope is enforced by joining through the slot — a foreign
    /// transaction id reads as NotFound, never as someone else's data.
    pub async fn update_status(
        pool: &PgPool,
        scope: &CompanyScope,
        transaction_id: Uuid,
        target: TransactionStatus,
        employee_profile_id: Option<Uuid>,
    ) -> Result<ParkingTransaction, AppError> {
        let mut tx = pool.begin().await?;

        // slot_id never changes after creation, so reading it unlocked and
        // locking the slot before the transaction row is race-free.
        let slot_id: Uuid = sqlx::query_scalar(
            "SELECT slot_id FROM parking_transactions WHERE id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        let slot = Self::lock_slot(&mut tx, slot_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        if slot.company_id != scope.company_id() {
            return Err(AppError::NotFound("Transaction not found".into()));
        }

        let current = sqlx::query_as::<_, ParkingTransaction>(
            "SELECT * FROM parking_transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        let from: TransactionStatus = current.status.parse().map_err(AppError::Internal)?;
        if !from.can_transition_to(target) {
            return Err(AppError::InvalidTransition {
                from: from.to_string(),
                to: target.to_string(),
            });
        }

        let updated = match target {
            TransactionStatus::Parked => {
                let updated = sqlx::query_as::<_, ParkingTransaction>(
                    "UPDATE parking_transactions
                     SET status = 'parked', parked_at = NOW(),
                         employee_assigned_id = COALESCE($2, employee_assigned_id)
                     WHERE id = $1
                     RETURNING *",
                )
                .bind(transaction_id)
                .bind(employee_profile_id)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "UPDATE parking_slots SET is_occupied = TRUE, updated_at = NOW()
                     WHERE id = $1",
                )
                .bind(slot_id)
                .execute(&mut *tx)
                .await?;
                updated
            }
            TransactionStatus::PendingRetrieve => {
                sqlx::query_as::<_, ParkingTransaction>(
                    "UPDATE parking_transactions
                     SET status = 'pending_retrieve', retrieve_requested_at = NOW()
                     WHERE id = $1
                     RETURNING *",
                )
                .bind(transaction_id)
                .fetch_one(&mut *tx)
                .await?
            }
            TransactionStatus::Delivered => {
                let updated = sqlx::query_as::<_, ParkingTransaction>(
                    "UPDATE parking_transactions
                     SET status = 'delivered', delivered_at = NOW()
                     WHERE id = $1
                     RETURNING *",
                )
                .bind(transaction_id)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "UPDATE parking_slots SET is_occupied = FALSE, updated_at = NOW()
                     WHERE id = $1",
                )
                .bind(slot_id)
                .execute(&mut *tx)
                .await?;
                updated
            }
            // Nothing transitions into pending_park; can_transition_to
            // rejected it above.
            TransactionStatus::PendingPark => unreachable!("no transition targets pending_park"),
        };

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn list(
        pool: &PgPool,
        scope: &CompanyScope,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<ParkingTransaction>, AppError> {
        let transactions = sqlx::query_as::<_, ParkingTransaction>(
            "SELECT t.* FROM parking_transactions t
             JOIN parking_slots s ON s.id = t.slot_id
             WHERE s.company_id = $1
               AND ($2::TEXT IS NULL OR t.status = $2)
             ORDER BY t.requested_at DESC",
        )
        .bind(scope.company_id())
        .bind(status.map(|s| s.to_string()))
        .fetch_all(pool)
        .await?;
        Ok(transactions)
    }

    pub async fn get(
        pool: &PgPool,
        scope: &CompanyScope,
        id: Uuid,
    ) -> Result<ParkingTransaction, AppError> {
        sqlx::query_as::<_, ParkingTransaction>(
            "SELECT t.* FROM parking_transactions t
             JOIN parking_slots s ON s.id = t.slot_id
             WHERE t.id = $1 AND s.company_id = $2",
        )
        .bind(id)
        .bind(scope.company_id())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".into()))
    }

    /// The employee profile of a principal, if it has one. Used to stamp
    /// employee_assigned_id on the park confirmation.
    pub async fn employee_profile_id(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM employee_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(id)
    }

    async fn lock_slot(
        tx: &mut Transaction<'_, Postgres>,
        slot_id: Uuid,
    ) -> Result<Option<ParkingSlot>, AppError> {
        let slot = sqlx::query_as::<_, ParkingSlot>(
            "SELECT * FROM parking_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(slot_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_code_uses_unambiguous_charset() {
        for _ in 0..50 {
            let code = generate_ticket_code();
            assert_eq!(code.len(), 6);
            for c in code.chars() {
                assert!(TICKET_CODE_CHARSET.contains(&(c as u8)), "bad char {c}");
                assert!(!"01OIL".contains(c), "ambiguous char {c}");
            }
        }
    }
}
