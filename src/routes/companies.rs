use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::rate_limit::check_rate_limit,
    models::{
        auth::AuthenticatedUser,
        company::{UpdateCompanyRequest, UpdateEmployeeRequest},
        user::{RegisterEmployeeRequest, UserRole},
    },
    services::{
        auth::AuthService,
        companies::{CompanyService, EmployeeService},
        tenancy::CompanyScope,
    },
    AppState,
};

fn require_admin(user: &AuthenticatedUser) -> Result<(), AppError> {
    match user.role {
        UserRole::CompanyAdmin => Ok(()),
        _ => Err(AppError::Permission("Admin access required".into())),
    }
}

/// A principal sees exactly its own company; unscoped callers get [].
pub async fn list_companies(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    let scope = CompanyScope::resolve(&state.db, &user, state.assignment_policy()).await?;
    let companies = CompanyService::list(scope.as_ref()).await;
    Ok(Json(serde_json::to_value(companies).unwrap()))
}

pub async fn get_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    let company = CompanyService::get(&state.db, &scope, id).await?;
    Ok(Json(serde_json::to_value(company).unwrap()))
}

pub async fn update_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCompanyRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    let company = CompanyService::update(&state.db, &scope, id, &body).await?;
    Ok(Json(serde_json::to_value(company).unwrap()))
}

pub async fn delete_company(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    CompanyService::delete(&state.db, &scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Employees are nested under the company resource; the path id must match
/// the caller's own company.
pub async fn list_employees(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    if company_id != scope.company_id() {
        return Ok(Json(json!([])));
    }
    let employees = EmployeeService::list(&state.db, &scope).await?;
    Ok(Json(serde_json::to_value(employees).unwrap()))
}

pub async fn create_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(company_id): Path<Uuid>,
    Json(mut body): Json<RegisterEmployeeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    if company_id != scope.company_id() {
        return Err(AppError::NotFound("Company not found".into()));
    }

    // Admin-created employees join the admin's own company; the code in the
    // body (if any) is replaced with the scoped company's code.
    body.company_code = scope.company.company_code.clone();
    let mut redis = state.redis.clone();
    let rate_key = format!("rate:create-employee:{}", scope.company_id());
    check_rate_limit(&mut redis, &rate_key, 30, 3600)
        .await
        .map_err(|_| AppError::RateLimited)?;

    let company = AuthService::register_employee(&state.db, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Employee registered successfully",
            "company_name": company.name,
        })),
    ))
}

pub async fn get_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((company_id, employee_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    if company_id != scope.company_id() {
        return Err(AppError::NotFound("Employee not found".into()));
    }
    let employee = EmployeeService::get(&state.db, &scope, employee_id).await?;
    Ok(Json(serde_json::to_value(employee).unwrap()))
}

pub async fn update_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((company_id, employee_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateEmployeeRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    if company_id != scope.company_id() {
        return Err(AppError::NotFound("Employee not found".into()));
    }
    let employee = EmployeeService::update(&state.db, &scope, employee_id, &body).await?;
    Ok(Json(serde_json::to_value(employee).unwrap()))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((company_id, employee_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    if company_id != scope.company_id() {
        return Err(AppError::NotFound("Employee not found".into()));
    }
    EmployeeService::delete(&state.db, &scope, employee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
