use axum::{extract::State, Extension};
use serde::Serialize;

use super::{CreateTeamRequest, TeamSummary};
use crate::api::ValidatedJson;
use crate::database::models::InvitationView;
use crate::database::teams::TeamRepository;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::services::team_service::{self, NewMember};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TeamList {
    pub teams: Vec<TeamSummary>,
    /// Pending invitations addressed to the caller
    pub invitations: Vec<InvitationView>,
}

/// GET /api/teams - teams the caller belongs to, plus their open invitations
pub async fn team_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<TeamList> {
    let repo = TeamRepository::new(state.pool.clone());
    let teams = repo.list_for_user(principal.user_id).await?;
    let ids: Vec<_> = teams.iter().map(|t| t.id).collect();
    let mut members = repo.members_of(&ids).await?;
    let counts = repo.bill_counts(&ids).await?;

    let teams = teams
        .into_iter()
        .map(|team| TeamSummary {
            members: members.remove(&team.id).unwrap_or_default(),
            bills_count: counts.get(&team.id).copied().unwrap_or(0),
            team,
        })
        .collect();
    let invitations = repo.pending_invitations_for(&principal.email).await?;

    Ok(ApiResponse::success(TeamList { teams, invitations }))
}

/// POST /api/teams - the caller becomes OWNER; listed members are added or invited
pub async fn team_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<CreateTeamRequest>,
) -> ApiResult<TeamSummary> {
    let members: Vec<NewMember> = req.members.iter().flatten().map(NewMember::from).collect();
    let team = team_service::create_team(
        &state.pool,
        principal.user_id,
        req.name.trim(),
        req.description.as_deref(),
        &members,
    )
    .await?;

    let members = TeamRepository::new(state.pool.clone()).members(team.id).await?;
    Ok(ApiResponse::created(TeamSummary {
        team,
        members,
        bills_count: 0,
    }))
}
