use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::UserSummary;
use crate::types::{InvitationStatus, Role};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub notifications_enabled: bool,
    pub joined_at: DateTime<Utc>,
}

/// Team reference embedded in bills and invitations
#[derive(Debug, Clone, Serialize)]
pub struct TeamRef {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberView>>,
}

pub const MEMBER_SELECT: &str = "SELECT tm.*, u.name AS user_name, u.email AS user_email \
     FROM team_members tm JOIN users u ON u.id = tm.user_id";

#[derive(Debug, FromRow)]
pub struct MemberRow {
    #[sqlx(flatten)]
    pub member: TeamMember,
    pub user_name: String,
    pub user_email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    #[serde(flatten)]
    pub member: TeamMember,
    pub user: UserSummary,
}

impl From<MemberRow> for MemberView {
    fn from(row: MemberRow) -> Self {
        let user = UserSummary {
            id: row.member.user_id,
            name: row.user_name,
            email: row.user_email,
        };
        MemberView { member: row.member, user }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamInvitation {
    pub id: Uuid,
    pub team_id: Uuid,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub invited_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const INVITATION_SELECT: &str = "SELECT i.*, t.name AS team_name, u.name AS inviter_name, u.email AS inviter_email \
     FROM team_invitations i JOIN teams t ON t.id = i.team_id LEFT JOIN users u ON u.id = i.invited_by_id";

#[derive(Debug, FromRow)]
pub struct InvitationRow {
    #[sqlx(flatten)]
    pub invitation: TeamInvitation,
    pub team_name: String,
    pub inviter_name: Option<String>,
    pub inviter_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Inviter {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationView {
    #[serde(flatten)]
    pub invitation: TeamInvitation,
    pub team: TeamRef,
    pub invited_by: Option<Inviter>,
}

impl From<InvitationRow> for InvitationView {
    fn from(row: InvitationRow) -> Self {
        let team = TeamRef {
            id: row.invitation.team_id,
            name: row.team_name,
            members: None,
        };
        let invited_by = match (row.inviter_name, row.inviter_email) {
            (Some(name), Some(email)) => Some(Inviter { name, email }),
            _ => None,
        };
        InvitationView {
            invitation: row.invitation,
            team,
            invited_by,
        }
    }
}
