use axum::extract::State;
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET / - service information
pub async fn root(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "BillSmart API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "endpoints": {
            "public": ["/health", "/api/auth/register", "/api/auth/login"],
            "protected": [
                "/api/auth/whoami",
                "/api/profile",
                "/api/bills",
                "/api/categories",
                "/api/teams",
                "/api/invitations",
                "/api/notifications",
                "/api/transactions",
                "/api/assets",
                "/api/scheduled-payments"
            ],
            "elevated": ["/api/notifications/send"]
        }
    })))
}

/// GET /health - 200 while the database answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    DatabaseManager::health_check(&state.pool).await.map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "database": "connected",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
