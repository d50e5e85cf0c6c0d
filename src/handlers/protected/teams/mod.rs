// handlers/protected/teams/mod.rs - teams, members and their invitations
//
// Non-members get 403 for every team id, existing or not.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::api::double_option;
use crate::api::validated::{assignable_role, not_blank};
use crate::database::models::{Bill, InvitationView, MemberView, Team};
use crate::database::teams::{BillStats, TeamRepository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::policy::{self, TeamCapability};
use crate::services::team_service::NewMember;
use crate::types::Role;

pub mod collection; // GET, POST /api/teams
pub mod members; // /api/teams/:id/members[/:memberId]
pub mod record; // GET, PATCH, DELETE /api/teams/:id

pub use collection::{team_create, team_list};
pub use members::{member_add, member_get, member_list, member_remove, member_update};
pub use record::{team_delete, team_get, team_update};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MemberInput {
    #[validate(email)]
    pub email: String,
    #[validate(custom = "assignable_role")]
    pub role: Role,
}

impl From<&MemberInput> for NewMember {
    fn from(input: &MemberInput) -> Self {
        NewMember {
            email: input.email.trim().to_string(),
            role: input.role,
        }
    }
}

fn initial_members(members: &[MemberInput]) -> Result<(), ValidationError> {
    if members.iter().all(|m| m.validate().is_ok()) {
        Ok(())
    } else {
        let mut error = ValidationError::new("members");
        error.message = Some("Each member needs a valid email and a MEMBER, ADMIN or ACCOUNTANT role".into());
        Err(error)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "initial_members")]
    pub members: Option<Vec<MemberInput>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub role: Option<Role>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<MemberView>,
    pub bills_count: i64,
}

#[derive(Debug, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<MemberView>,
    pub bills: Vec<Bill>,
    pub invitations: Vec<InvitationView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOverview {
    pub team: TeamDetail,
    pub bills_stats: BillStats,
}

/// The caller's role in the team after checking `capability`
async fn authorize(
    repo: &TeamRepository,
    principal: &Principal,
    team_id: Uuid,
    capability: TeamCapability,
) -> Result<Role, ApiError> {
    let role = repo.membership(team_id, principal.user_id).await?;
    policy::team(role, capability).check("Team")?;
    role.ok_or_else(|| ApiError::forbidden("You are not a member of this team"))
}
