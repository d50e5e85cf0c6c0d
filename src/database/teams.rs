use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::changeset::Changeset;
use crate::database::models::team::{INVITATION_SELECT, MEMBER_SELECT};
use crate::database::models::{Bill, InvitationRow, InvitationView, MemberRow, MemberView, Team};
use crate::database::DatabaseError;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BillStats {
    pub total: i64,
    pub paid: i64,
    pub unpaid: i64,
    pub overdue: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub unpaid_amount: Decimal,
}

/// The caller's role in `team_id`, or `None` for non-members
pub async fn membership<'e, E: PgExecutor<'e>>(
    executor: E,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Role>, DatabaseError> {
    Ok(
        sqlx::query_scalar::<_, Role>("SELECT role FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?,
    )
}

/// Read side of teams, members and invitations. Multi-row writes live in
/// `services::team_service`.
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn membership(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<Role>, DatabaseError> {
        membership(&self.pool, team_id, user_id).await
    }

    pub async fn find(&self, team_id: Uuid) -> Result<Team, DatabaseError> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Team"))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Team>, DatabaseError> {
        Ok(sqlx::query_as::<_, Team>(
            r#"
            SELECT t.* FROM teams t
            JOIN team_members tm ON tm.team_id = t.id
            WHERE tm.user_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn members(&self, team_id: Uuid) -> Result<Vec<MemberView>, DatabaseError> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!("{} WHERE tm.team_id = $1 ORDER BY tm.joined_at", MEMBER_SELECT))
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(MemberView::from).collect())
    }

    pub async fn members_of(&self, team_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<MemberView>>, DatabaseError> {
        let mut grouped: HashMap<Uuid, Vec<MemberView>> = HashMap::new();
        if team_ids.is_empty() {
            return Ok(grouped);
        }
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "{} WHERE tm.team_id = ANY($1) ORDER BY tm.joined_at",
            MEMBER_SELECT
        ))
        .bind(team_ids)
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            grouped.entry(row.member.team_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    pub async fn member(&self, team_id: Uuid, member_id: Uuid) -> Result<MemberView, DatabaseError> {
        sqlx::query_as::<_, MemberRow>(&format!("{} WHERE tm.team_id = $1 AND tm.id = $2", MEMBER_SELECT))
            .bind(team_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .map(MemberView::from)
            .ok_or_else(|| DatabaseError::not_found("Member"))
    }

    pub async fn member_for_user(&self, team_id: Uuid, user_id: Uuid) -> Result<MemberView, DatabaseError> {
        sqlx::query_as::<_, MemberRow>(&format!("{} WHERE tm.team_id = $1 AND tm.user_id = $2", MEMBER_SELECT))
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(MemberView::from)
            .ok_or_else(|| DatabaseError::not_found("Member"))
    }

    pub async fn bill_counts(&self, team_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, DatabaseError> {
        if team_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT team_id, COUNT(*) FROM bills WHERE team_id = ANY($1) GROUP BY team_id",
        )
        .bind(team_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// The soonest unpaid bills of a team
    pub async fn upcoming_bills(&self, team_id: Uuid, limit: i64) -> Result<Vec<Bill>, DatabaseError> {
        Ok(sqlx::query_as::<_, Bill>(
            "SELECT * FROM bills WHERE team_id = $1 AND is_paid = FALSE ORDER BY due_date ASC LIMIT $2",
        )
        .bind(team_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn bill_stats(&self, team_id: Uuid, now: DateTime<Utc>) -> Result<BillStats, DatabaseError> {
        Ok(sqlx::query_as::<_, BillStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_paid) AS paid,
                COUNT(*) FILTER (WHERE NOT is_paid) AS unpaid,
                COUNT(*) FILTER (WHERE NOT is_paid AND due_date < $2) AS overdue,
                COALESCE(SUM(amount), 0) AS total_amount,
                COALESCE(SUM(amount) FILTER (WHERE is_paid), 0) AS paid_amount,
                COALESCE(SUM(amount) FILTER (WHERE NOT is_paid), 0) AS unpaid_amount
            FROM bills
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn pending_invitations(&self, team_id: Uuid) -> Result<Vec<InvitationView>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvitationRow>(&format!(
            "{} WHERE i.team_id = $1 AND i.status = 'PENDING' ORDER BY i.created_at DESC",
            INVITATION_SELECT
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(InvitationView::from).collect())
    }

    pub async fn pending_invitations_for(&self, email: &str) -> Result<Vec<InvitationView>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvitationRow>(&format!(
            "{} WHERE lower(i.email) = lower($1) AND i.status = 'PENDING' ORDER BY i.created_at DESC",
            INVITATION_SELECT
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(InvitationView::from).collect())
    }

    pub async fn invitation(&self, invitation_id: Uuid) -> Result<InvitationView, DatabaseError> {
        sqlx::query_as::<_, InvitationRow>(&format!("{} WHERE i.id = $1", INVITATION_SELECT))
            .bind(invitation_id)
            .fetch_optional(&self.pool)
            .await?
            .map(InvitationView::from)
            .ok_or_else(|| DatabaseError::not_found("Invitation"))
    }

    /// Update team fields only if `user_id` is an OWNER or ADMIN of it
    pub async fn update(&self, team_id: Uuid, user_id: Uuid, changeset: Changeset) -> Result<Team, DatabaseError> {
        let mut q = changeset.where_id(team_id);
        q.push(" AND id IN (SELECT team_id FROM team_members WHERE user_id = ")
            .push_bind(user_id)
            .push(" AND role IN ('OWNER', 'ADMIN')) RETURNING *");

        q.build_query_as::<Team>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Team"))
    }
}
