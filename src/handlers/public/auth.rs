// handlers/public/auth.rs - account creation and token acquisition

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::api::ValidatedJson;
use crate::auth::{generate_jwt, Claims};
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::account_service;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: u64,
    pub user: User,
}

/**
 * POST /api/auth/register - create an account
 *
 * Creates the user as OWNER of a fresh workspace named after them, seeded
 * with the default categories. 409 when the email is already registered.
 */
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<Value> {
    let user = account_service::register(&state.pool, req.name.trim(), req.email.trim(), &req.password).await?;

    Ok(ApiResponse::created(json!({
        "user": user,
        "message": "User registered successfully",
    })))
}

/// POST /api/auth/login - exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = account_service::authenticate(&state.pool, req.email.trim(), &req.password).await?;

    let hours = state.config.security.jwt_expiry_hours;
    let claims = Claims::new(user.id, user.email.clone(), hours);
    let token = generate_jwt(&claims, &state.config.security.jwt_secret)?;
    tracing::info!("User {} logged in", user.id);

    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_in: hours * 3600,
        user,
    }))
}
