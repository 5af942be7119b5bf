use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::AuthenticatedUser,
        slot::{CreateSlotRequest, UpdateSlotRequest},
    },
    services::{slots::SlotService, tenancy::CompanyScope},
    AppState,
};

pub async fn list_slots(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    // Unscoped principals get an empty list, not an error.
    let scope = CompanyScope::resolve(&state.db, &user, state.assignment_policy()).await?;
    let slots = match scope {
        Some(scope) => SlotService::list(&state.db, &scope).await?,
        None => Vec::new(),
    };
    Ok(Json(serde_json::to_value(slots).unwrap()))
}

pub async fn create_slot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    let slot = SlotService::create(&state.db, &scope, &body).await?;
    Ok((StatusCode::CREATED, Json(serde_json::to_value(slot).unwrap())))
}

pub async fn get_slot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    let slot = SlotService::get(&state.db, &scope, id).await?;
    Ok(Json(serde_json::to_value(slot).unwrap()))
}

pub async fn update_slot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    let slot = SlotService::update(&state.db, &scope, id, &body).await?;
    Ok(Json(serde_json::to_value(slot).unwrap()))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let scope = CompanyScope::require(&state.db, &user, state.assignment_policy()).await?;
    SlotService::delete(&state.db, &scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
