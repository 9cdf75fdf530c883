use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub brevo_api_key: String,
    pub email_from: String,
    pub email_sender_name: String,
    pub auth_token_secret: String,
    pub auth_token_ttl_hours: i64,
    /// Shared secret the inbound email webhook must present. `None` leaves it open.
    pub inbound_email_secret: Option<String>,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            brevo_api_key: require_env("BREVO_API_KEY")?,
            email_from: require_env("EMAIL_FROM")?,
            email_sender_name: std::env::var("EMAIL_SENDER_NAME")
                .unwrap_or_else(|_| "ProcuraAI".to_string()),
            auth_token_secret: require_env("AUTH_TOKEN_SECRET")?,
            auth_token_ttl_hours: std::env::var("AUTH_TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "168".to_string())
                .parse::<i64>()
                .context("AUTH_TOKEN_TTL_HOURS must be a whole number of hours")?,
            inbound_email_secret: std::env::var("INBOUND_EMAIL_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
