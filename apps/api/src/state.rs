use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::auth::token::TokenSigner;
use crate::config::Config;
use crate::email::mailer::Mailer;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub config: Config,
    /// Outbound email transport. Default: Brevo transactional API.
    pub mailer: Arc<dyn Mailer>,
    pub tokens: TokenSigner,
}
