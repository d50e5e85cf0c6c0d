// handlers/protected/invitations.rs - invitations addressed to the caller

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::api::{parse_id, ValidatedJson};
use crate::database::models::InvitationView;
use crate::database::teams::TeamRepository;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::policy;
use crate::services::team_service;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationAction {
    Accept,
    Decline,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RespondRequest {
    pub action: InvitationAction,
}

/// GET /api/invitations - the caller's pending invitations
pub async fn invitation_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<InvitationView>> {
    let repo = TeamRepository::new(state.pool.clone());
    Ok(ApiResponse::success(repo.pending_invitations_for(&principal.email).await?))
}

/// GET /api/invitations/:id - invitee only
pub async fn invitation_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<InvitationView> {
    let id = parse_id(&id, "Invitation")?;
    let invitation = TeamRepository::new(state.pool.clone()).invitation(id).await?;
    policy::invitation_view(&principal.email, &invitation.invitation).check("Invitation")?;
    Ok(ApiResponse::success(invitation))
}

/// POST /api/invitations/:id - `{ "action": "accept" | "decline" }`
pub async fn invitation_respond(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RespondRequest>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invitation")?;
    let accept = req.action == InvitationAction::Accept;
    let member =
        team_service::respond_to_invitation(&state.pool, id, principal.user_id, &principal.email, accept).await?;

    Ok(match member {
        Some(member) => ApiResponse::success(json!({
            "message": "Invitation accepted",
            "member": member,
        })),
        None => message("Invitation declined"),
    })
}

/// DELETE /api/invitations/:id - inviter, invitee or a team OWNER/ADMIN
pub async fn invitation_cancel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invitation")?;
    team_service::cancel_invitation(&state.pool, id, principal.user_id, &principal.email).await?;
    Ok(message("Invitation cancelled"))
}
