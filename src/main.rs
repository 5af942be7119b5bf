use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valetdesk_api::config::Config;
use valetdesk_api::middleware::auth::JwtSecret;
use valetdesk_api::services::notifications::WhatsAppService;
use valetdesk_api::services::{metrics, tenancy::AssignmentPolicy};
use valetdesk_api::{db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let whatsapp = Arc::new(WhatsAppService::new(&config));
    if whatsapp.is_configured() {
        info!("WhatsApp sender configured");
    } else {
        info!("WhatsApp sender not configured — outbound messages disabled");
    }

    match AssignmentPolicy::from_config(config.orphan_employee_company_id) {
        AssignmentPolicy::RejectOrphan => {
            info!("Orphan employees are rejected (no fallback company)")
        }
        AssignmentPolicy::AssignToCompany(id) => {
            info!("Orphan employees are attached to company {id}")
        }
    }

    metrics::start(pool.clone());

    let state = AppState {
        db: pool,
        redis: redis_conn,
        redis_client: redis_client.clone(),
        config: config.clone(),
        whatsapp,
    };

    // CORS: allow the configured base origin; localhost is always allowed
    // for development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
            return true;
        }
        o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth & registration
        .route("/auth/register-company", post(routes::auth::register_company))
        .route("/auth/register-employee", post(routes::auth::register_employee))
        .route("/auth/verify-company-code", get(routes::auth::verify_company_code))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        // Companies & employees
        .route("/companies", get(routes::companies::list_companies))
        .route(
            "/companies/{id}",
            get(routes::companies::get_company)
                .put(routes::companies::update_company)
                .delete(routes::companies::delete_company),
        )
        .route(
            "/companies/{id}/employees",
            get(routes::companies::list_employees).post(routes::companies::create_employee),
        )
        .route(
            "/companies/{id}/employees/{eid}",
            get(routes::companies::get_employee)
                .put(routes::companies::update_employee)
                .delete(routes::companies::delete_employee),
        )
        // Parking slots
        .route("/slots", get(routes::slots::list_slots).post(routes::slots::create_slot))
        .route(
            "/slots/{id}",
            get(routes::slots::get_slot)
                .put(routes::slots::update_slot)
                .delete(routes::slots::delete_slot),
        )
        // Transactions
        .route("/transactions", get(routes::transactions::list_transactions))
        .route("/transactions/{id}", get(routes::transactions::get_transaction))
        .route(
            "/transactions/{id}/update-status",
            post(routes::transactions::update_status),
        )
        // WhatsApp webhook
        .route("/webhook/whatsapp", post(routes::webhook::receive_message))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("valetdesk API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
