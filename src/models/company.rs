use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub location: String,
    pub company_code: String,
    pub admin_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

/// Employee row joined with its user record, for listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmployeeWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub phone_number: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Public metadata returned by company-code verification. No admin identity,
/// no code — safe to hand to an unauthenticated caller.
#[derive(Debug, Serialize)]
pub struct CompanyPublic {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub phone_number: String,
}

impl From<Company> for CompanyPublic {
    fn from(c: Company) -> Self {
        Self {
            id: c.id,
            name: c.name,
            location: c.location,
            phone_number: c.phone_number,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
}
