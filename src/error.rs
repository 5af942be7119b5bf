use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error taxonomy for the API. Every service returns `Result<_, AppError>`;
/// handlers convert to JSON via the `IntoResponse` impl below.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Permission(String),

    #[error("Invalid status value: {0}")]
    InvalidStatus(String),

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{0}")]
    SlotUnavailable(String),

    #[error("Too many attempts. Try again in a few minutes.")]
    RateLimited,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate(_) | AppError::InvalidStatus(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Permission(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } | AppError::SlotUnavailable(_) => {
                StatusCode::CONFLICT
            }
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the logs; clients get an opaque message.
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Duplicate("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Permission("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InvalidStatus("bogus".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidTransition {
                from: "pending_park".into(),
                to: "delivered".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::SlotUnavailable("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = AppError::InvalidTransition {
            from: "parked".into(),
            to: "pending_park".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("parked"));
        assert!(msg.contains("pending_park"));
    }
}
