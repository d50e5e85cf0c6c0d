use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;
use serde_json::Value;

use super::{authorize, days, require_team_member, UpdateBillRequest};
use crate::api::{parse_id, ValidatedJson};
use crate::database::models::{BillView, Bill};
use crate::database::Changeset;
use crate::error::ApiError;
use crate::handlers::protected::categories::require_category;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::policy::Capability;
use crate::services::bill_service;
use crate::state::AppState;
use crate::types::RecurringPeriod;

/// GET /api/bills/:id - bill with category, team members, reminders and owner
pub async fn bill_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<BillView> {
    let id = parse_id(&id, "Bill")?;
    let (repo, bill) = authorize(&state, &principal, id, Capability::Read).await?;
    Ok(ApiResponse::success(repo.detail(bill).await?))
}

/// PATCH /api/bills/:id - partial update; `reminders` replaces the whole set
pub async fn bill_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateBillRequest>,
) -> ApiResult<BillView> {
    let id = parse_id(&id, "Bill")?;
    let (repo, current) = authorize(&state, &principal, id, Capability::Write).await?;

    if let Some(Some(team_id)) = req.team_id {
        require_team_member(&state, &principal, team_id).await?;
    }
    if let Some(Some(category_id)) = req.category_id {
        require_category(&state.pool, principal.workspace_scope()?, category_id).await?;
    }
    let paid = bill_service::paid_transition(req.is_paid, req.paid_at, Utc::now())?;

    let mut changeset = Changeset::new("bills")
        .touch()
        .set_opt("name", req.name.map(|n| n.trim().to_string()))
        .set_opt("amount", req.amount)
        .set_opt("due_date", req.due_date)
        .set_opt("category_id", req.category_id)
        .set_opt("description", req.description)
        .set_opt("is_recurring", req.is_recurring)
        .set_opt("team_id", req.team_id);

    // a period only means something on a recurring bill
    let recurring = req.is_recurring.unwrap_or(current.is_recurring);
    changeset = if recurring {
        changeset.set_opt("recurring_period", req.recurring_period)
    } else if req.is_recurring == Some(false) || req.recurring_period.is_some() {
        changeset.set("recurring_period", None::<RecurringPeriod>)
    } else {
        changeset
    };

    if let Some((is_paid, paid_at)) = paid {
        changeset = changeset.set("is_paid", is_paid).set("paid_at", paid_at);
    }

    let reminder_days = req.reminders.as_deref().map(days);
    let bill: Bill = repo.update(id, changeset, reminder_days.as_deref()).await?;
    tracing::debug!("User {} updated bill {}", principal.user_id, bill.id);

    let view = repo
        .with_relations(vec![bill])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Bill not found"))?;
    Ok(ApiResponse::success(view))
}

/// DELETE /api/bills/:id
pub async fn bill_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Bill")?;
    let (repo, _) = authorize(&state, &principal, id, Capability::Delete).await?;
    repo.delete(id).await?;
    tracing::info!("User {} deleted bill {}", principal.user_id, id);
    Ok(message("Bill deleted"))
}
