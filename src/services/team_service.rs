//! Multi-row team workflows. Each public function runs in one database
//! transaction; reads without side effects live in `database::teams`.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::models::{InvitationView, MemberView, Notification, Team, TeamInvitation, TeamMember, User};
use crate::database::teams::TeamRepository;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::policy::{self, TeamCapability};
use crate::types::{InvitationStatus, NotificationType, Role};

#[derive(Debug, Clone)]
pub struct NewMember {
    pub email: String,
    pub role: Role,
}

/// Result of adding someone by email: registered users join directly,
/// anyone else gets a pending invitation.
#[derive(Debug)]
pub enum AddOutcome {
    Member(MemberView),
    Invitation(InvitationView),
}

enum Added {
    Member,
    Invitation(Uuid),
}

fn added_message(team_name: &str) -> String {
    format!("You have been added to the team \"{}\"", team_name)
}

async fn insert_member(conn: &mut PgConnection, team_id: Uuid, user_id: Uuid, role: Role) -> Result<bool, DatabaseError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO team_members (id, team_id, user_id, role) VALUES ($1, $2, $3, $4)
        ON CONFLICT (team_id, user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(team_id)
    .bind(user_id)
    .bind(role)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(inserted > 0)
}

async fn pending_invitation_exists(conn: &mut PgConnection, team_id: Uuid, email: &str) -> Result<bool, DatabaseError> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM team_invitations WHERE team_id = $1 AND lower(email) = lower($2) AND status = 'PENDING')",
    )
    .bind(team_id)
    .bind(email)
    .fetch_one(&mut *conn)
    .await?)
}

async fn insert_invitation(
    conn: &mut PgConnection,
    team_id: Uuid,
    email: &str,
    role: Role,
    invited_by: Uuid,
) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO team_invitations (id, team_id, email, role, status, invited_by_id) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(team_id)
    .bind(email)
    .bind(role)
    .bind(InvitationStatus::Pending)
    .bind(invited_by)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

/// Add `member` to the team or invite them. With `strict`, an existing
/// membership or pending invitation is an error; otherwise it is skipped.
async fn add_by_email(
    conn: &mut PgConnection,
    team: &Team,
    inviter_id: Uuid,
    member: &NewMember,
    strict: bool,
) -> Result<Option<Added>, ApiError> {
    if let Some(user) = User::find_by_email(&mut *conn, &member.email).await? {
        if !insert_member(conn, team.id, user.id, member.role).await? {
            return if strict {
                Err(ApiError::bad_request("User is already a member of this team"))
            } else {
                Ok(None)
            };
        }
        Notification::create(
            &mut *conn,
            user.id,
            None,
            Some(team.id),
            NotificationType::TeamMemberAdded,
            &added_message(&team.name),
        )
        .await?;
        return Ok(Some(Added::Member));
    }

    if pending_invitation_exists(conn, team.id, &member.email).await? {
        return if strict {
            Err(ApiError::bad_request("An invitation has already been sent to this email"))
        } else {
            Ok(None)
        };
    }
    let id = insert_invitation(conn, team.id, &member.email, member.role, inviter_id).await?;
    Ok(Some(Added::Invitation(id)))
}

pub async fn create_team(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
    members: &[NewMember],
) -> Result<Team, ApiError> {
    let mut tx = pool.begin().await?;

    let team = sqlx::query_as::<_, Team>("INSERT INTO teams (id, name, description) VALUES ($1, $2, $3) RETURNING *")
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;
    insert_member(&mut tx, team.id, owner_id, Role::Owner).await?;

    for member in members {
        add_by_email(&mut tx, &team, owner_id, member, false).await?;
    }

    tx.commit().await?;
    tracing::info!("Created team {} with {} initial members", team.id, members.len());
    Ok(team)
}

pub async fn add_member(pool: &PgPool, team_id: Uuid, inviter_id: Uuid, member: &NewMember) -> Result<AddOutcome, ApiError> {
    let repo = TeamRepository::new(pool.clone());
    let team = repo.find(team_id).await?;

    let mut tx = pool.begin().await?;
    let members = lock_members(&mut tx, team_id).await?;
    policy::team(actor_role(&members, inviter_id), TeamCapability::ManageMembers).check("Team")?;
    let added = add_by_email(&mut tx, &team, inviter_id, member, true).await?;
    tx.commit().await?;

    match added {
        Some(Added::Invitation(id)) => Ok(AddOutcome::Invitation(repo.invitation(id).await?)),
        _ => {
            let user = User::find_by_email(pool, &member.email)
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?;
            Ok(AddOutcome::Member(repo.member_for_user(team_id, user.id).await?))
        }
    }
}

/// Requested changes to one member row
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberChange {
    pub role: Option<Role>,
    pub notifications_enabled: Option<bool>,
}

/// The team's member rows, locked until the transaction ends. Every
/// membership write takes this lock first, so roles read here stay current.
async fn lock_members(conn: &mut PgConnection, team_id: Uuid) -> Result<Vec<TeamMember>, DatabaseError> {
    Ok(
        sqlx::query_as::<_, TeamMember>("SELECT * FROM team_members WHERE team_id = $1 ORDER BY id FOR UPDATE")
            .bind(team_id)
            .fetch_all(&mut *conn)
            .await?,
    )
}

fn actor_role(members: &[TeamMember], actor_id: Uuid) -> Option<Role> {
    members.iter().find(|m| m.user_id == actor_id).map(|m| m.role)
}

/// Apply a role and/or notification change with the team's rows locked.
/// All checks run before the first write. Promoting someone to OWNER
/// demotes the current owner to ADMIN in the same transaction.
pub async fn update_member(
    pool: &PgPool,
    team_id: Uuid,
    member_id: Uuid,
    actor_id: Uuid,
    change: MemberChange,
) -> Result<MemberView, ApiError> {
    let mut tx = pool.begin().await?;

    let members = lock_members(&mut tx, team_id).await?;
    let role = actor_role(&members, actor_id);
    policy::team(role, TeamCapability::View).check("Team")?;
    let target = members
        .iter()
        .find(|m| m.id == member_id)
        .ok_or_else(|| ApiError::not_found("Member not found"))?;
    policy::member_update(
        actor_id,
        role.unwrap_or(Role::Member),
        target,
        change.role,
        change.notifications_enabled.is_some(),
    )
    .check("Member")?;

    if let Some(enabled) = change.notifications_enabled {
        sqlx::query("UPDATE team_members SET notifications_enabled = $3 WHERE team_id = $1 AND id = $2")
            .bind(team_id)
            .bind(member_id)
            .bind(enabled)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(new_role) = change.role {
        if new_role == Role::Owner && target.role != Role::Owner {
            // demote first: at most one OWNER row may exist at any point
            sqlx::query("UPDATE team_members SET role = 'ADMIN' WHERE team_id = $1 AND role = 'OWNER'")
                .bind(team_id)
                .execute(&mut *tx)
                .await?;
            tracing::info!("Ownership of team {} moves to member {}", team_id, member_id);
        }
        sqlx::query("UPDATE team_members SET role = $3 WHERE team_id = $1 AND id = $2")
            .bind(team_id)
            .bind(member_id)
            .bind(new_role)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(TeamRepository::new(pool.clone()).member(team_id, member_id).await?)
}

pub async fn remove_member(pool: &PgPool, team_id: Uuid, member_id: Uuid, actor_id: Uuid) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let members = lock_members(&mut tx, team_id).await?;
    let role = actor_role(&members, actor_id);
    policy::team(role, TeamCapability::View).check("Team")?;
    let target = members
        .iter()
        .find(|m| m.id == member_id)
        .ok_or_else(|| ApiError::not_found("Member not found"))?;
    policy::remove_member(actor_id, role.unwrap_or(Role::Member), target).check("Member")?;

    sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND id = $2 AND role <> 'OWNER'")
        .bind(team_id)
        .bind(member_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Accept or decline an invitation addressed to `email`. Accepting when
/// already a member keeps the existing membership.
pub async fn respond_to_invitation(
    pool: &PgPool,
    invitation_id: Uuid,
    user_id: Uuid,
    email: &str,
    accept: bool,
) -> Result<Option<MemberView>, ApiError> {
    let mut tx = pool.begin().await?;

    let invitation = sqlx::query_as::<_, TeamInvitation>("SELECT * FROM team_invitations WHERE id = $1 FOR UPDATE")
        .bind(invitation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;
    policy::invitation_respond(email, &invitation).check("Invitation")?;

    let status = if accept {
        insert_member(&mut tx, invitation.team_id, user_id, invitation.role).await?;
        InvitationStatus::Accepted
    } else {
        InvitationStatus::Declined
    };
    sqlx::query("UPDATE team_invitations SET status = $2, updated_at = now() WHERE id = $1")
        .bind(invitation_id)
        .bind(status)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if !accept {
        return Ok(None);
    }
    let member = TeamRepository::new(pool.clone())
        .member_for_user(invitation.team_id, user_id)
        .await?;
    Ok(Some(member))
}

pub async fn cancel_invitation(pool: &PgPool, invitation_id: Uuid, actor_id: Uuid, email: &str) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let invitation = sqlx::query_as::<_, TeamInvitation>("SELECT * FROM team_invitations WHERE id = $1 FOR UPDATE")
        .bind(invitation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;
    let members = lock_members(&mut tx, invitation.team_id).await?;
    policy::invitation_cancel(actor_id, email, actor_role(&members, actor_id), &invitation).check("Invitation")?;

    sqlx::query("DELETE FROM team_invitations WHERE id = $1")
        .bind(invitation_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Delete a team with its invitations, bills (and their reminders and
/// notifications) and memberships. The actor must still be OWNER once the
/// member rows are locked.
pub async fn delete_team(pool: &PgPool, team_id: Uuid, actor_id: Uuid) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let members = lock_members(&mut tx, team_id).await?;
    policy::team(actor_role(&members, actor_id), TeamCapability::Delete).check("Team")?;

    sqlx::query("DELETE FROM team_invitations WHERE team_id = $1")
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM reminders WHERE bill_id IN (SELECT id FROM bills WHERE team_id = $1)")
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM notifications WHERE team_id = $1 OR bill_id IN (SELECT id FROM bills WHERE team_id = $1)")
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM bills WHERE team_id = $1")
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM team_members WHERE team_id = $1")
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(team_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::not_found("Team not found"));
    }

    tx.commit().await?;
    tracing::info!("Deleted team {}", team_id);
    Ok(())
}
