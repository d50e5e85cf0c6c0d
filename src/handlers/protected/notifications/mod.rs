// handlers/protected/notifications/mod.rs - the caller's notifications
//
// Bulk operations are all-or-nothing: one foreign id forbids the whole request.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::database::models::Notification;
use crate::database::Repository;
use crate::error::ApiError;

pub mod collection; // GET, PATCH, DELETE /api/notifications
pub mod record; // GET, PATCH, DELETE /api/notifications/:id

pub use collection::{notification_bulk_delete, notification_bulk_update, notification_list};
pub use record::{notification_delete, notification_get, notification_update};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    pub ids: Option<Vec<Uuid>>,
    pub read: Option<bool>,
    #[serde(default)]
    pub mark_all_as_read: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNotificationRequest {
    pub read: bool,
}

/// Every id must belong to the repository's user
async fn require_owned(repo: &Repository<Notification>, ids: &[Uuid]) -> Result<(), ApiError> {
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();
    if repo.count_ids(&unique).await? != unique.len() as i64 {
        return Err(ApiError::forbidden("Some notifications do not belong to you"));
    }
    Ok(())
}
