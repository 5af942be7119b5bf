use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::company::{
        Company, EmployeeWithUser, UpdateCompanyRequest, UpdateEmployeeRequest,
    },
    services::tenancy::CompanyScope,
};

pub struct CompanyService;

impl CompanyService {
    /// A principal only ever sees its own company; unscoped callers get an
    /// empty list, not an error.
    pub async fn list(scope: Option<&CompanyScope>) -> Vec<Company> {
        match scope {
            Some(s) => vec![s.company.clone()],
            None => Vec::new(),
        }
    }

    /// Ownership is re-verified against the scope, not just presence of the
    /// row — a foreign company id reads as NotFound.
    pub async fn get(
        pool: &PgPool,
        scope: &CompanyScope,
        id: Uuid,
    ) -> Result<Company, AppError> {
        if id != scope.company_id() {
            return Err(AppError::NotFound("Company not found".into()));
        }
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Company not found".into()))
    }

    pub async fn update(
        pool: &PgPool,
        scope: &CompanyScope,
        id: Uuid,
        req: &UpdateCompanyRequest,
    ) -> Result<Company, AppError> {
        if id != scope.company_id() {
            return Err(AppError::NotFound("Company not found".into()));
        }
        let company = sqlx::query_as::<_, Company>(
            "UPDATE companies
             SET name = COALESCE($1, name),
                 phone_number = COALESCE($2, phone_number),
                 location = COALESCE($3, location),
                 updated_at = NOW()
             WHERE id = $4
             RETURNING *",
        )
        .bind(&req.name)
        .bind(&req.phone_number)
        .bind(&req.location)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(crate::services::auth::map_unique_violation)?
        .ok_or_else(|| AppError::NotFound("Company not found".into()))?;
        Ok(company)
    }

    pub async fn delete(pool: &PgPool, scope: &CompanyScope, id: Uuid) -> Result<(), AppError> {
        if id != scope.company_id() {
            return Err(AppError::NotFound("Company not found".into()));
        }
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Company not found".into()));
        }
        Ok(())
    }
}

pub struct EmployeeService;

impl EmployeeService {
    pub async fn list(
        pool: &PgPool,
        scope: &CompanyScope,
    ) -> Result<Vec<EmployeeWithUser>, AppError> {
        let employees = sqlx::query_as::<_, EmployeeWithUser>(
            "SELECT ep.id, ep.user_id, ep.company_id, ep.phone_number,
                    u.username, u.email, u.first_name, u.last_name, u.is_active,
                    ep.created_at
             FROM employee_profiles ep
             JOIN users u ON u.id = ep.user_id
             WHERE ep.company_id = $1
             ORDER BY u.last_name, u.first_name",
        )
        .bind(scope.company_id())
        .fetch_all(pool)
        .await?;
        Ok(employees)
    }

    pub async fn get(
        pool: &PgPool,
        scope: &CompanyScope,
        id: Uuid,
    ) -> Result<EmployeeWithUser, AppError> {
        sqlx::query_as::<_, EmployeeWithUser>(
            "SELECT ep.id, ep.user_id, ep.company_id, ep.phone_number,
                    u.username, u.email, u.first_name, u.last_name, u.is_active,
                    ep.created_at
             FROM employee_profiles ep
             JOIN users u ON u.id = ep.user_id
             WHERE ep.id = $1 AND ep.company_id = $2",
        )
        .bind(id)
        .bind(scope.company_id())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".into()))
    }

    pub async fn update(
        pool: &PgPool,
        scope: &CompanyScope,
        id: Uuid,
        req: &UpdateEmployeeRequest,
    ) -> Result<EmployeeWithUser, AppError> {
        // Verify ownership before touching anything.
        let existing = Self::get(pool, scope, id).await?;

        let mut tx = pool.begin().await?;

        if let Some(phone) = &req.phone_number {
            sqlx::query("UPDATE employee_profiles SET phone_number = $1 WHERE id = $2")
                .bind(phone)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(active) = req.is_active {
            sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
                .bind(active)
                .bind(existing.user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Self::get(pool, scope, id).await
    }

    /// Removes the profile and its user account together.
    pub async fn delete(pool: &PgPool, scope: &CompanyScope, id: Uuid) -> Result<(), AppError> {
        let existing = Self::get(pool, scope, id).await?;

        // Deleting the user cascades to the profile.
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(existing.user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
