// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use redis::Client as RedisClient;
use sqlx::PgPool;

use config::Config;
use services::notifications::WhatsAppService;
use services::tenancy::AssignmentPolicy;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub redis_client: RedisClient,
    pub config: Arc<Config>,
    pub whatsapp: Arc<WhatsAppService>,
}

impl AppState {
    /// The orphan-employee policy for this deployment, chosen once from
    /// configuration and passed explicitly wherever scope is resolved.
    pub fn assignment_policy(&self) -> AssignmentPolicy {
        AssignmentPolicy::from_config(self.config.orphan_employee_company_id)
    }
}
