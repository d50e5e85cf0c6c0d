use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::DatabaseError;
use crate::types::NotificationType;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bill_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Notification {
    const TABLE: &'static str = "notifications";
    const ENTITY: &'static str = "Notification";
    const TIMESTAMPED: bool = false;
}

impl Notification {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        bill_id: Option<Uuid>,
        team_id: Option<Uuid>,
        kind: NotificationType,
        message: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, bill_id, team_id, type, message) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(bill_id)
        .bind(team_id)
        .bind(kind)
        .bind(message)
        .execute(executor)
        .await?;
        Ok(())
    }
}
