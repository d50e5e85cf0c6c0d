use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::models::User;
use crate::database::Scope;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Role;

/// The resolved session: who is calling and which workspace they act in.
/// Loaded from the `users` row on every request, so role and workspace
/// changes take effect without reissuing tokens.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub workspace_id: Option<Uuid>,
    pub role: Role,
}

impl Principal {
    pub fn workspace_id(&self) -> Result<Uuid, ApiError> {
        self.workspace_id
            .ok_or_else(|| ApiError::unauthorized("No workspace found for user"))
    }

    pub fn workspace_scope(&self) -> Result<Scope, ApiError> {
        self.workspace_id().map(Scope::Workspace)
    }

    pub fn user_scope(&self) -> Scope {
        Scope::User(self.user_id)
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            name: user.name,
            workspace_id: user.workspace_id,
            role: user.role,
        }
    }
}

/// Middleware that checks the JWT subject still exists and injects the [`Principal`]
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = User::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("User validation failed: user {} no longer exists", auth_user.user_id);
            ApiError::unauthorized("User not found")
        })?;

    let principal = Principal::from(user);
    tracing::debug!("Resolved principal {} ({})", principal.email, principal.user_id);

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
