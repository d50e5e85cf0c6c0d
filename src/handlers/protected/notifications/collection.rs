use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{require_owned, BulkDeleteRequest, BulkUpdateRequest};
use crate::api::{parse_flag, PageRequest, Pagination, ValidatedJson};
use crate::database::models::Notification;
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub read: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkDeleteQuery {
    pub all: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
    pub unread_count: i64,
}

/// GET /api/notifications - newest first, optionally filtered by `read`
pub async fn notification_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<NotificationList> {
    let read = parse_flag(query.read.as_deref(), "read")?;
    let page = PageRequest::resolve(query.page.as_deref(), query.limit.as_deref(), &state.config.api);
    let repo = Repository::<Notification>::new(state.pool.clone(), principal.user_scope());

    let (notifications, total) = repo
        .select_page(
            |q| {
                if let Some(read) = read {
                    q.push(" AND read = ").push_bind(read);
                }
            },
            "created_at DESC, id DESC",
            page.limit,
            page.offset(),
        )
        .await?;
    let unread_count = repo.count_where(|q| {
        q.push(" AND NOT read");
    })
    .await?;

    Ok(ApiResponse::success(NotificationList {
        notifications,
        pagination: Pagination::new(total, page),
        unread_count,
    }))
}

/// PATCH /api/notifications - `{ markAllAsRead: true }` or `{ ids, read? }`
pub async fn notification_bulk_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<BulkUpdateRequest>,
) -> ApiResult<Value> {
    let repo = Repository::<Notification>::new(state.pool.clone(), principal.user_scope());

    let updated = if req.mark_all_as_read {
        sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
            .bind(principal.user_id)
            .execute(&state.pool)
            .await?
            .rows_affected()
    } else {
        let ids = req.ids.unwrap_or_default();
        if ids.is_empty() {
            return Err(ApiError::bad_request("Provide ids or markAllAsRead"));
        }
        require_owned(&repo, &ids).await?;
        sqlx::query("UPDATE notifications SET read = $3 WHERE user_id = $1 AND id = ANY($2)")
            .bind(principal.user_id)
            .bind(&ids)
            .bind(req.read.unwrap_or(true))
            .execute(&state.pool)
            .await?
            .rows_affected()
    };

    Ok(ApiResponse::success(json!({
        "message": "Notifications updated",
        "count": updated,
    })))
}

/// DELETE /api/notifications - `?all=true` or a body of `{ ids }`
pub async fn notification_bulk_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<BulkDeleteQuery>,
    body: Option<Json<BulkDeleteRequest>>,
) -> ApiResult<Value> {
    let all = parse_flag(query.all.as_deref(), "all")?.unwrap_or(false);
    let repo = Repository::<Notification>::new(state.pool.clone(), principal.user_scope());

    let deleted = if all {
        sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(principal.user_id)
            .execute(&state.pool)
            .await?
            .rows_affected()
    } else {
        let ids = body.map(|Json(b)| b.ids).unwrap_or_default();
        if ids.is_empty() {
            return Err(ApiError::bad_request("Provide ids or all=true"));
        }
        require_owned(&repo, &ids).await?;
        sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND id = ANY($2)")
            .bind(principal.user_id)
            .bind(&ids)
            .execute(&state.pool)
            .await?
            .rows_affected()
    };

    Ok(ApiResponse::success(json!({
        "message": "Notifications deleted",
        "count": deleted,
    })))
}
