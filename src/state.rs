use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::mailer::Mailer;

/// Shared handles every handler receives through `State`
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>, config: AppConfig) -> Self {
        Self {
            pool,
            mailer,
            config: Arc::new(config),
        }
    }
}
