use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::rate_limit::check_rate_limit,
    models::{
        auth::AuthenticatedUser,
        user::{LoginRequest, RegisterCompanyRequest, RegisterEmployeeRequest},
    },
    services::{auth::AuthService, metrics, tenancy::CompanyScope},
    AppState,
};

pub async fn register_company(
    State(state): State<AppState>,
    Json(body): Json<RegisterCompanyRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let company = AuthService::register_company(&state.db, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Company registered successfully",
            "company_code": company.company_code,
            "company_name": company.name,
        })),
    ))
}

pub async fn register_employee(
    State(state): State<AppState>,
    Json(body): Json<RegisterEmployeeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let company = AuthService::register_employee(&state.db, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Employee registered successfully",
            "company_name": company.name,
        })),
    ))
}

#[derive(Deserialize)]
pub struct VerifyCodeQuery {
    pub code: Option<String>,
}

pub async fn verify_company_code(
    State(state): State<AppState>,
    Query(query): Query<VerifyCodeQuery>,
) -> Result<Json<Value>, AppError> {
    let code = query.code.unwrap_or_default();
    let company = AuthService::verify_company_code(&state.db, &code).await?;
    Ok(Json(serde_json::to_value(company).unwrap()))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    // Rate limit: 5 attempts per 15 min per username
    let rate_key = format!("rate:login:{}", body.username.to_lowercase());
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, 5, 900)
        .await
        .map_err(|_| AppError::RateLimited)?;

    match AuthService::login(
        &state.db,
        &body,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await
    {
        Ok(res) => {
            metrics::LOGINS_COUNTER.with_label_values(&["success"]).inc();
            Ok(Json(serde_json::to_value(res).unwrap()))
        }
        Err(e) => {
            metrics::LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            Err(e)
        }
    }
}

/// Identity echo: who am I, and which company am I scoped to (if any).
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    let scope = CompanyScope::resolve(&state.db, &user, state.assignment_policy()).await?;
    Ok(Json(json!({
        "user_id": user.user_id,
        "role": user.role,
        "company": scope.map(|s| json!({
            "id": s.company.id,
            "name": s.company.name,
            "company_code": s.company.company_code,
        })),
    })))
}
