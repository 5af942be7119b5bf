use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::AuthenticatedUser,
        transaction::{TransactionStatus, UpdateStatusRequest},
        user::UserRole,
    },
    services::{metrics, tenancy::CompanyScope, transactions::TransactionService},
    AppState,
};

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<TransactionStatus>()
                .map_err(|_| AppError::InvalidStatus(s.to_string()))
        })
        .transpose()?;

    // Unscoped principals get an empty list, not an error.
    let scope = CompanyScope::resolve(&state.db, &user, state.assignment_policy()).await?;
    let transactions = match scope {
        Some(scope) => TransactionService::list(&state.db, &scope, status).await?,
        None => Vec::new(),
    };
    Ok(Json(serde_json::to_value(transactions).unwrap()))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    let transaction = TransactionService::get(&state.db, &scope, id).await?;
    Ok(Json(serde_json::to_value(transaction).unwrap()))
}

/// Staff endpoint driving the state machine. The target status must be the
/// current state's single legal successor; anything else is rejected before
/// any write happens.
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let target: TransactionStatus = body
        .status
        .parse()
        .map_err(|_| AppError::InvalidStatus(body.status.clone()))?;

    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;

    // Park confirmations record which employee handled the car.
    let employee_profile_id = match user.role {
        UserRole::Employee if target == TransactionStatus::Parked => {
            TransactionService::employee_profile_id(&state.db, user.user_id).await?
        }
        _ => None,
    };

    let transaction =
        TransactionService::update_status(&state.db, &scope, id, target, employee_profile_id)
            .await?;

    metrics::STATUS_TRANSITIONS_COUNTER
        .with_label_values(&[&target.to_string()])
        .inc();

    Ok(Json(serde_json::to_value(transaction).unwrap()))
}
