use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{auth::AuthenticatedUser, company::Company, user::UserRole},
};

/// What to do with an employee principal that has no profile row.
///
/// `RejectOrphan` leaves the principal unscoped (empty lists, Permission on
/// mutations). `AssignToCompany` attaches a profile to the named company on
/// first resolution — the operator opts in per deployment; nothing is ever
/// attached silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentPolicy {
    RejectOrphan,
    AssignToCompany(Uuid),
}

impl AssignmentPolicy {
    pub fn from_config(orphan_company_id: Option<Uuid>) -> Self {
        match orphan_company_id {
            Some(id) => AssignmentPolicy::AssignToCompany(id),
            None => AssignmentPolicy::RejectOrphan,
        }
    }
}

/// The tenant scope of one request: the company the caller acts for.
/// Resolved exactly once at the route boundary and passed into services.
#[derive(Debug, Clone)]
pub struct CompanyScope {
    pub company: Company,
}

impl CompanyScope {
    pub fn company_id(&self) -> Uuid {
        self.company.id
    }

    /// Resolve the principal to its owning company, if any.
    ///
    /// - company_admin → the company whose admin_user_id matches (1:1)
    /// - employee → the company of the employee profile (1:1)
    /// - employee without a profile → per `policy`
    pub async fn resolve(
        pool: &PgPool,
        user: &AuthenticatedUser,
        policy: AssignmentPolicy,
    ) -> Result<Option<CompanyScope>, AppError> {
        let company = match user.role {
            UserRole::CompanyAdmin => {
                sqlx::query_as::<_, Company>(
                    "SELECT * FROM companies WHERE admin_user_id = $1",
                )
                .bind(user.user_id)
                .fetch_optional(pool)
                .await?
            }
            UserRole::Employee => {
                let company = sqlx::query_as::<_, Company>(
                    "SELECT c.* FROM companies c
                     JOIN employee_profiles ep ON ep.company_id = c.id
                     WHERE ep.user_id = $1",
                )
                .bind(user.user_id)
                .fetch_optional(pool)
                .await?;

                match (company, policy) {
                    (Some(c), _) => Some(c),
                    (None, AssignmentPolicy::RejectOrphan) => None,
                    (None, AssignmentPolicy::AssignToCompany(company_id)) => {
                        Self::attach_orphan(pool, user.user_id, company_id).await?
                    }
                }
            }
        };

        Ok(company.map(|company| CompanyScope { company }))
    }

    /// Like `resolve`, but an unscoped principal is a hard failure.
    /// Use for mutating operations; list operations should instead map
    /// `None` to an empty result set.
    pub async fn require(
        pool: &PgPool,
        user: &AuthenticatedUser,
        policy: AssignmentPolicy,
    ) -> Result<CompanyScope, AppError> {
        Self::resolve(pool, user, policy)
            .await?
            .ok_or_else(|| AppError::Permission("User not associated with any company".into()))
    }

    async fn attach_orphan(
        pool: &PgPool,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(company_id)
            .fetch_optional(pool)
            .await?;

        let Some(company) = company else {
            tracing::warn!(
                "orphan assignment target company {company_id} does not exist; leaving user {user_id} unscoped"
            );
            return Ok(None);
        };

        // Another request may resolve the same orphan concurrently; the
        // unique index on user_id makes the second insert a no-op.
        sqlx::query(
            "INSERT INTO employee_profiles (user_id, company_id, phone_number)
             VALUES ($1, $2, '')
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(company_id)
        .execute(pool)
        .await?;

        tracing::info!("attached orphan employee {user_id} to company {}", company.id);
        Ok(Some(company))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_to_reject_when_unconfigured() {
        assert_eq!(
            AssignmentPolicy::from_config(None),
            AssignmentPolicy::RejectOrphan
        );
    }

    #[test]
    fn policy_uses_configured_company() {
        let id = Uuid::new_v4();
        assert_eq!(
            AssignmentPolicy::from_config(Some(id)),
            AssignmentPolicy::AssignToCompany(id)
        );
    }
}
