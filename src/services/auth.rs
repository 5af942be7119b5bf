use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::Rng;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        auth::Claims,
        company::{Company, CompanyPublic},
        user::{
            LoginRequest, LoginResponse, RegisterCompanyRequest, RegisterEmployeeRequest, User,
            UserRole,
        },
    },
};

const COMPANY_CODE_LEN: usize = 8;
const COMPANY_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate an opaque 8-char uppercase company code.
pub fn generate_company_code() -> String {
    let mut rng = rand::thread_rng();
    (0..COMPANY_CODE_LEN)
        .map(|_| COMPANY_CODE_CHARSET[rng.gen_range(0..COMPANY_CODE_CHARSET.len())] as char)
        .collect()
}

fn validate_required(fields: &[(&str, &str)]) -> Result<(), AppError> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{name} is required")));
        }
    }
    Ok(())
}

pub struct AuthService;

impl AuthService {
    /// Register a company together with its admin user. User and company are
    /// created in one database transaction: no admin without a company, no
    /// company without an admin.
    pub async fn register_company(
        pool: &PgPool,
        req: &RegisterCompanyRequest,
    ) -> Result<Company, AppError> {
        validate_required(&[
            ("company_name", &req.company_name),
            ("company_phone", &req.company_phone),
            ("company_location", &req.company_location),
            ("first_name", &req.first_name),
            ("last_name", &req.last_name),
            ("username", &req.username),
            ("email", &req.email),
            ("password", &req.password),
        ])?;

        Self::check_username_email_free(pool, &req.username, &req.email).await?;

        let name_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM companies WHERE name = $1)")
                .bind(&req.company_name)
                .fetch_one(pool)
                .await?;
        if name_taken {
            return Err(AppError::Duplicate("Company name already exists".into()));
        }

        let password_hash =
            bcrypt::hash(&req.password, 12).map_err(|e| AppError::Internal(e.into()))?;
        let company_code = generate_company_code();

        let mut tx = pool.begin().await?;

        let admin = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, 'company_admin')
             RETURNING *",
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        let company = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (name, phone_number, location, company_code, admin_user_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&req.company_name)
        .bind(&req.company_phone)
        .bind(&req.company_location)
        .bind(&company_code)
        .bind(admin.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;
        Ok(company)
    }

    /// Register an employee under a company identified by its code.
    /// User and profile are created in one database transaction.
    pub async fn register_employee(
        pool: &PgPool,
        req: &RegisterEmployeeRequest,
    ) -> Result<Company, AppError> {
        validate_required(&[
            ("company_code", &req.company_code),
            ("first_name", &req.first_name),
            ("last_name", &req.last_name),
            ("username", &req.username),
            ("email", &req.email),
            ("phone_number", &req.phone_number),
            ("password", &req.password),
        ])?;

        Self::check_username_email_free(pool, &req.username, &req.email).await?;

        let company = Self::find_by_code(pool, &req.company_code)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid company code".into()))?;

        let password_hash =
            bcrypt::hash(&req.password, 12).map_err(|e| AppError::Internal(e.into()))?;

        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, $3, $4, $5, 'employee')
             RETURNING *",
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        sqlx::query(
            "INSERT INTO employee_profiles (user_id, company_id, phone_number)
             VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(company.id)
        .bind(&req.phone_number)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;
        Ok(company)
    }

    /// Validate credentials and mint an HS256 access token.
    pub async fn login(
        pool: &PgPool,
        req: &LoginRequest,
        jwt_secret: &str,
        access_ttl: u64,
    ) -> Result<LoginResponse, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 AND is_active = TRUE",
        )
        .bind(&req.username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid credentials".into()))?;

        let valid = bcrypt::verify(&req.password, &user.password_hash)
            .map_err(|_| AppError::Validation("Invalid credentials".into()))?;
        if !valid {
            return Err(AppError::Validation("Invalid credentials".into()));
        }

        let role: UserRole = user.role.parse().map_err(AppError::Internal)?;
        let access_token = Self::generate_access_token(&user, role, jwt_secret, access_ttl)?;

        Ok(LoginResponse {
            access_token,
            user: user.into(),
        })
    }

    /// Case-insensitive company-code lookup, public metadata only.
    pub async fn verify_company_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<CompanyPublic, AppError> {
        if code.trim().is_empty() {
            return Err(AppError::Validation("Company code is required".into()));
        }
        Self::find_by_code(pool, code)
            .await?
            .map(CompanyPublic::from)
            .ok_or_else(|| AppError::NotFound("Invalid company code".into()))
    }

    /// Codes are stored uppercase; normalize before comparing.
    async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Company>, AppError> {
        let company =
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE company_code = $1")
                .bind(code.trim().to_uppercase())
                .fetch_optional(pool)
                .await?;
        Ok(company)
    }

    async fn check_username_email_free(
        pool: &PgPool,
        username: &str,
        email: &str,
    ) -> Result<(), AppError> {
        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;
        if username_taken {
            return Err(AppError::Duplicate("Username already exists".into()));
        }

        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?;
        if email_taken {
            return Err(AppError::Duplicate("Email already exists".into()));
        }
        Ok(())
    }

    fn generate_access_token(
        user: &User,
        role: UserRole,
        jwt_secret: &str,
        access_ttl: u64,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            role,
            iat: now,
            exp: now + access_ttl as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(e.into()))
    }
}

/// Map a unique-index violation raced past the pre-checks to Duplicate.
pub(crate) fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::Duplicate("Value already exists".into());
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_code_is_eight_uppercase_alphanumerics() {
        for _ in 0..50 {
            let code = generate_company_code();
            assert_eq!(code.len(), 8);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn missing_required_field_is_a_validation_error() {
        let err = validate_required(&[("username", "bob"), ("password", "  ")]).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("password")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
