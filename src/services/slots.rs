use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::slot::{CreateSlotRequest, ParkingSlot, UpdateSlotRequest},
    services::{auth::map_unique_violation, tenancy::CompanyScope},
};

/// Company-scoped slot CRUD. Occupancy is not writable here: the only
/// sanctioned mutator is the transaction state machine, which flips it
/// inside the same database transaction as the status change.
pub struct SlotService;

impl SlotService {
    pub async fn list(pool: &PgPool, scope: &CompanyScope) -> Result<Vec<ParkingSlot>, AppError> {
        let slots = sqlx::query_as::<_, ParkingSlot>(
            "SELECT * FROM parking_slots WHERE company_id = $1 ORDER BY division, name",
        )
        .bind(scope.company_id())
        .fetch_all(pool)
        .await?;
        Ok(slots)
    }

    pub async fn create(
        pool: &PgPool,
        scope: &CompanyScope,
        req: &CreateSlotRequest,
    ) -> Result<ParkingSlot, AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".into()));
        }
        if req.division.trim().is_empty() {
            return Err(AppError::Validation("division is required".into()));
        }

        let slot = sqlx::query_as::<_, ParkingSlot>(
            "INSERT INTO parking_slots (company_id, name, division)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(scope.company_id())
        .bind(req.name.trim())
        .bind(req.division.trim())
        .fetch_one(pool)
        .await
        .map_err(|e| match map_unique_violation(e) {
            AppError::Duplicate(_) => {
                AppError::Duplicate("A slot with this name already exists".into())
            }
            other => other,
        })?;
        Ok(slot)
    }

    pub async fn get(
        pool: &PgPool,
        scope: &CompanyScope,
        id: Uuid,
    ) -> Result<ParkingSlot, AppError> {
        sqlx::query_as::<_, ParkingSlot>(
            "SELECT * FROM parking_slots WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(scope.company_id())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Slot not found".into()))
    }

    pub async fn update(
        pool: &PgPool,
        scope: &CompanyScope,
        id: Uuid,
        req: &UpdateSlotRequest,
    ) -> Result<ParkingSlot, AppError> {
        let slot = sqlx::query_as::<_, ParkingSlot>(
            "UPDATE parking_slots
             SET name = COALESCE($1, name),
                 division = COALESCE($2, division),
                 is_active = COALESCE($3, is_active),
                 updated_at = NOW()
             WHERE id = $4 AND company_id = $5
             RETURNING *",
        )
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.division.as_deref().map(str::trim))
        .bind(req.is_active)
        .bind(id)
        .bind(scope.company_id())
        .fetch_optional(pool)
        .await
        .map_err(map_unique_violation)?
        .ok_or_else(|| AppError::NotFound("Slot not found".into()))?;
        Ok(slot)
    }

    pub async fn delete(pool: &PgPool, scope: &CompanyScope, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM parking_slots WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(scope.company_id())
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Slot not found".into()));
        }
        Ok(())
    }
}
