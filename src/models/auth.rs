use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRole;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT — available via Axum extractors.
/// Carries identity only; the owning company is resolved per request
/// by the tenancy service, never from the token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}
