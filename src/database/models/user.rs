use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    pub workspace_id: Option<Uuid>,
    pub email_notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public face of a user embedded in other resources
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl User {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn find_by_email<'e, E: PgExecutor<'e>>(executor: E, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(executor)
            .await?)
    }

    pub async fn summary<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<UserSummary>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }
}
