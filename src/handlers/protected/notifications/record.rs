use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::Value;

use super::UpdateNotificationRequest;
use crate::api::{parse_id, ValidatedJson};
use crate::database::models::Notification;
use crate::database::Repository;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;

fn repository(state: &AppState, principal: &Principal) -> Repository<Notification> {
    Repository::new(state.pool.clone(), principal.user_scope())
}

/// GET /api/notifications/:id - reading a notification marks it read
pub async fn notification_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let id = parse_id(&id, "Notification")?;
    let repo = repository(&state, &principal);
    let notification = repo.update_404(id, repo.changeset().set("read", true)).await?;
    Ok(ApiResponse::success(notification))
}

/// PATCH /api/notifications/:id
pub async fn notification_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateNotificationRequest>,
) -> ApiResult<Notification> {
    let id = parse_id(&id, "Notification")?;
    let repo = repository(&state, &principal);
    let notification = repo.update_404(id, repo.changeset().set("read", req.read)).await?;
    Ok(ApiResponse::success(notification))
}

/// DELETE /api/notifications/:id
pub async fn notification_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Notification")?;
    repository(&state, &principal).delete_404(id).await?;
    Ok(message("Notification deleted"))
}
