use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::{authorize, MemberInput, UpdateMemberRequest};
use crate::api::{parse_id, ValidatedJson};
use crate::database::models::{InvitationView, MemberView};
use crate::database::teams::TeamRepository;
use crate::error::ApiError;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::policy::TeamCapability;
use crate::services::team_service::{self, AddOutcome, MemberChange, NewMember};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MemberList {
    pub members: Vec<MemberView>,
    pub invitations: Vec<InvitationView>,
}

/// GET /api/teams/:id/members
pub async fn member_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<MemberList> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::View).await?;

    Ok(ApiResponse::success(MemberList {
        members: repo.members(team_id).await?,
        invitations: repo.pending_invitations(team_id).await?,
    }))
}

/**
 * POST /api/teams/:id/members - add a registered user or invite an email
 *
 * 201 with the member for registered users (who also get a notification),
 * 201 with `{ invitation, message }` otherwise. 400 when the user is already
 * a member or the email already has a pending invitation.
 */
pub async fn member_add(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<MemberInput>,
) -> Result<Response, ApiError> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::ManageMembers).await?;

    let outcome = team_service::add_member(&state.pool, team_id, principal.user_id, &NewMember::from(&req)).await?;
    Ok(match outcome {
        AddOutcome::Member(member) => ApiResponse::created(member).into_response(),
        AddOutcome::Invitation(invitation) => ApiResponse::created(json!({
            "invitation": invitation,
            "message": "Invitation sent",
        }))
        .into_response(),
    })
}

/// GET /api/teams/:id/members/:memberId
pub async fn member_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, member_id)): Path<(String, String)>,
) -> ApiResult<MemberView> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::View).await?;

    let member_id = parse_id(&member_id, "Member")?;
    Ok(ApiResponse::success(repo.member(team_id, member_id).await?))
}

/// PATCH /api/teams/:id/members/:memberId - `role` (OWNER only) and/or
/// `notificationsEnabled` (the member themselves or a team admin)
pub async fn member_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, member_id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<UpdateMemberRequest>,
) -> ApiResult<MemberView> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::View).await?;
    let member_id = parse_id(&member_id, "Member")?;

    if req.role.is_none() && req.notifications_enabled.is_none() {
        return Err(ApiError::bad_request("Nothing to update: provide role or notificationsEnabled"));
    }

    let change = MemberChange {
        role: req.role,
        notifications_enabled: req.notifications_enabled,
    };
    let member = team_service::update_member(&state.pool, team_id, member_id, principal.user_id, change).await?;
    if let Some(role) = req.role {
        tracing::info!("Member {} of team {} is now {}", member_id, team_id, role.as_str());
    }

    Ok(ApiResponse::success(member))
}

/// DELETE /api/teams/:id/members/:memberId - admins remove others, anyone may leave
pub async fn member_remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, member_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::View).await?;
    let member_id = parse_id(&member_id, "Member")?;

    team_service::remove_member(&state.pool, team_id, member_id, principal.user_id).await?;
    Ok(message("Member removed"))
}
