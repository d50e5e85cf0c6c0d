// handlers/protected/profile.rs - the caller's own account

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::api::validated::not_blank;
use crate::api::{double_option, ValidatedJson};
use crate::database::models::User;
use crate::database::Changeset;
use crate::error::ApiError;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::services::account_service::{self, AccountError, ProfileStats};
use crate::state::AppState;

const DELETE_CONFIRMATION: &str = "DELETE";

#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub stats: ProfileStats,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    pub email_notifications: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
    #[validate(length(min = 1))]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1))]
    pub confirmation: String,
}

async fn load_user(state: &AppState, principal: &Principal) -> Result<User, ApiError> {
    User::find_by_id(&state.pool, principal.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// GET /api/profile - account details with usage counts
pub async fn profile_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<ProfileView> {
    let user = load_user(&state, &principal).await?;
    let stats = account_service::profile_stats(&state.pool, user.id, user.workspace_id).await?;
    Ok(ApiResponse::success(ProfileView { user, stats }))
}

/// PATCH /api/profile
pub async fn profile_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<User> {
    if let Some(email) = req.email.as_deref() {
        if account_service::email_in_use(&state.pool, email, principal.user_id).await? {
            return Err(ApiError::conflict("Email is already in use"));
        }
    }

    let changeset = Changeset::new("users")
        .touch()
        .set_opt("name", req.name.map(|n| n.trim().to_string()))
        .set_opt("email", req.email.map(|e| e.trim().to_string()))
        .set_opt("phone", req.phone)
        .set_opt("email_notifications", req.email_notifications);

    let mut q = changeset.where_id(principal.user_id);
    q.push(" RETURNING *");
    let user = q.build_query_as::<User>().fetch_one(&state.pool).await?;

    Ok(ApiResponse::success(user))
}

/// POST /api/profile/password
pub async fn profile_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Value> {
    if req.new_password != req.confirm_password {
        return Err(ApiError::field("confirmPassword", "Passwords do not match"));
    }
    account_service::change_password(&state.pool, principal.user_id, &req.current_password, &req.new_password).await?;
    Ok(message("Password updated successfully"))
}

/// POST /api/profile/delete - requires the password and the literal confirmation "DELETE"
pub async fn profile_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<DeleteAccountRequest>,
) -> ApiResult<Value> {
    if req.confirmation != DELETE_CONFIRMATION {
        return Err(ApiError::field("confirmation", "Type DELETE to confirm"));
    }
    account_service::delete_account(&state.pool, principal.user_id, &req.password)
        .await
        .map_err(|e| match e {
            AccountError::WrongPassword => ApiError::field("password", "Password is incorrect"),
            other => other.into(),
        })?;
    Ok(message("Account deleted"))
}
