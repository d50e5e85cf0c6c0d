use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::DatabaseError;

pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// Seeded into every new workspace
pub const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("General", "#6B7280"),
    ("Marketing", "#EF4444"),
    ("Development", "#3B82F6"),
    ("Operations", "#10B981"),
];

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Category {
    const TABLE: &'static str = "categories";
    const ENTITY: &'static str = "Category";
}

impl Category {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        workspace_id: Uuid,
        name: &str,
        color: &str,
    ) -> Result<Category, DatabaseError> {
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, workspace_id, name, color) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(name)
        .bind(color)
        .fetch_one(executor)
        .await?)
    }

    /// Categories among `ids` that belong to `workspace_id`
    pub async fn find_many<'e, E: PgExecutor<'e>>(
        executor: E,
        workspace_id: Option<Uuid>,
        ids: &[Uuid],
    ) -> Result<Vec<Category>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = ANY($1) AND ($2::uuid IS NULL OR workspace_id = $2)",
        )
        .bind(ids)
        .bind(workspace_id)
        .fetch_all(executor)
        .await?)
    }
}
