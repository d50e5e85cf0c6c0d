use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::{password, AuthError};
use crate::database::models::category::DEFAULT_CATEGORIES;
use crate::database::models::{Category, User, Workspace};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::types::Role;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("A user with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("You own a workspace; transfer ownership before deleting your account")]
    OwnsWorkspace,
    #[error("You own a team; transfer team ownership before deleting your account")]
    OwnsTeam,
    #[error("User not found")]
    UserNotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        AccountError::Database(err.into())
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => ApiError::conflict(err.to_string()),
            AccountError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AccountError::WrongPassword => ApiError::field("currentPassword", err.to_string()),
            AccountError::OwnsWorkspace | AccountError::OwnsTeam => ApiError::bad_request(err.to_string()),
            AccountError::UserNotFound => ApiError::not_found(err.to_string()),
            AccountError::Auth(e) => e.into(),
            AccountError::Database(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub bills_count: i64,
    pub teams_count: i64,
    pub categories_count: i64,
    pub unread_notifications_count: i64,
}

pub fn workspace_name(user_name: &str) -> String {
    format!("{}'s Workspace", user_name)
}

/// Create the user (workspace OWNER), their workspace and the default
/// categories in one transaction.
pub async fn register(pool: &PgPool, name: &str, email: &str, plain_password: &str) -> Result<User, AccountError> {
    if User::find_by_email(pool, email).await?.is_some() {
        return Err(AccountError::EmailTaken);
    }
    let password_hash = password::hash(plain_password)?;

    let mut tx = pool.begin().await?;

    let user_id = Uuid::new_v4();
    let inserted = sqlx::query("INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5)")
        .bind(user_id)
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(Role::Owner)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from);
    match inserted {
        Err(e) if e.is_unique_violation() => return Err(AccountError::EmailTaken),
        other => other?,
    };

    let workspace = Workspace::create(&mut *tx, &workspace_name(name), user_id).await?;
    let user = sqlx::query_as::<_, User>("UPDATE users SET workspace_id = $2 WHERE id = $1 RETURNING *")
        .bind(user_id)
        .bind(workspace.id)
        .fetch_one(&mut *tx)
        .await?;

    for (category, color) in DEFAULT_CATEGORIES {
        Category::create(&mut *tx, workspace.id, category, color).await?;
    }

    tx.commit().await?;
    tracing::info!("Registered user {} with workspace {}", user.id, workspace.id);
    Ok(user)
}

pub async fn authenticate(pool: &PgPool, email: &str, plain_password: &str) -> Result<User, AccountError> {
    let user = User::find_by_email(pool, email)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;
    if !password::verify(plain_password, &user.password_hash)? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(AccountError::InvalidCredentials);
    }
    Ok(user)
}

async fn load(pool: &PgPool, user_id: Uuid) -> Result<User, AccountError> {
    User::find_by_id(pool, user_id).await?.ok_or(AccountError::UserNotFound)
}

pub async fn change_password(pool: &PgPool, user_id: Uuid, current: &str, new: &str) -> Result<(), AccountError> {
    let user = load(pool, user_id).await?;
    if !password::verify(current, &user.password_hash)? {
        return Err(AccountError::WrongPassword);
    }
    let password_hash = password::hash(new)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Refused while the user owns a workspace or a team, so neither is left without an owner
pub async fn delete_account(pool: &PgPool, user_id: Uuid, plain_password: &str) -> Result<(), AccountError> {
    let user = load(pool, user_id).await?;
    if !password::verify(plain_password, &user.password_hash)? {
        return Err(AccountError::WrongPassword);
    }

    let mut tx = pool.begin().await?;

    if Workspace::count_owned_by(&mut *tx, user_id).await? > 0 {
        return Err(AccountError::OwnsWorkspace);
    }
    let owned_teams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM team_members WHERE user_id = $1 AND role = 'OWNER'")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if owned_teams > 0 {
        return Err(AccountError::OwnsTeam);
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("Deleted account {}", user_id);
    Ok(())
}

pub async fn email_in_use(pool: &PgPool, email: &str, except: Uuid) -> Result<bool, AccountError> {
    Ok(User::find_by_email(pool, email).await?.is_some_and(|u| u.id != except))
}

pub async fn profile_stats(pool: &PgPool, user_id: Uuid, workspace_id: Option<Uuid>) -> Result<ProfileStats, AccountError> {
    Ok(sqlx::query_as::<_, ProfileStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM bills WHERE user_id = $1) AS bills_count,
            (SELECT COUNT(*) FROM team_members WHERE user_id = $1) AS teams_count,
            (SELECT COUNT(*) FROM categories WHERE workspace_id = $2) AS categories_count,
            (SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read) AS unread_notifications_count
        "#,
    )
    .bind(user_id)
    .bind(workspace_id)
    .fetch_one(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_named_after_user() {
        assert_eq!(workspace_name("Ann"), "Ann's Workspace");
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(ApiError::from(AccountError::EmailTaken).status_code(), 409);
        assert_eq!(ApiError::from(AccountError::InvalidCredentials).status_code(), 401);
        assert_eq!(ApiError::from(AccountError::WrongPassword).status_code(), 400);
        assert_eq!(ApiError::from(AccountError::OwnsWorkspace).status_code(), 400);
        assert_eq!(ApiError::from(AccountError::UserNotFound).status_code(), 404);
    }
}
