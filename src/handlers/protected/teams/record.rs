use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;
use serde_json::Value;

use super::{authorize, TeamDetail, TeamOverview, UpdateTeamRequest};
use crate::api::{parse_id, ValidatedJson};
use crate::database::models::Team;
use crate::database::teams::TeamRepository;
use crate::database::Changeset;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::policy::TeamCapability;
use crate::services::team_service;
use crate::state::AppState;

const UPCOMING_BILLS: i64 = 5;

/// GET /api/teams/:id - members, the next unpaid bills, open invitations and bill statistics
pub async fn team_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<TeamOverview> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::View).await?;

    let team = repo.find(team_id).await?;
    let detail = TeamDetail {
        members: repo.members(team_id).await?,
        bills: repo.upcoming_bills(team_id, UPCOMING_BILLS).await?,
        invitations: repo.pending_invitations(team_id).await?,
        team,
    };
    let bills_stats = repo.bill_stats(team_id, Utc::now()).await?;

    Ok(ApiResponse::success(TeamOverview {
        team: detail,
        bills_stats,
    }))
}

/// PATCH /api/teams/:id - OWNER or ADMIN
pub async fn team_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTeamRequest>,
) -> ApiResult<Team> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::Update).await?;

    let changeset = Changeset::new("teams")
        .touch()
        .set_opt("name", req.name.map(|n| n.trim().to_string()))
        .set_opt("description", req.description);
    let team = repo.update(team_id, principal.user_id, changeset).await?;
    Ok(ApiResponse::success(team))
}

/// DELETE /api/teams/:id - OWNER only; removes the team's bills with it
pub async fn team_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let repo = TeamRepository::new(state.pool.clone());
    let team_id = parse_id(&id, "Team")?;
    authorize(&repo, &principal, team_id, TeamCapability::Delete).await?;

    team_service::delete_team(&state.pool, team_id, principal.user_id).await?;
    Ok(message("Team deleted"))
}
