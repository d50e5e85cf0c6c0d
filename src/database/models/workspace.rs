use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub async fn create<'e, E: PgExecutor<'e>>(executor: E, name: &str, owner_id: Uuid) -> Result<Workspace, DatabaseError> {
        Ok(sqlx::query_as::<_, Workspace>(
            "INSERT INTO workspaces (id, name, owner_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(owner_id)
        .fetch_one(executor)
        .await?)
    }

    pub async fn count_owned_by<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> Result<i64, DatabaseError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM workspaces WHERE owner_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await?)
    }
}
