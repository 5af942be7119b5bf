use std::env;

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    // Twilio WhatsApp sender (optional — outbound messages are skipped when unset)
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_whatsapp_number: Option<String>,
    /// When set, employee principals without a profile are attached to this
    /// company instead of being rejected.
    pub orphan_employee_company_id: Option<Uuid>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "3600".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").ok().filter(|s| !s.is_empty()),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").ok().filter(|s| !s.is_empty()),
            twilio_whatsapp_number: env::var("TWILIO_WHATSAPP_NUMBER")
                .ok()
                .filter(|s| !s.is_empty()),
            orphan_employee_company_id: env::var("ORPHAN_EMPLOYEE_COMPANY_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.parse())
                .transpose()?,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
