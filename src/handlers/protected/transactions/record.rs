use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{with_relations, ApprovalRequest, UpdateTransactionRequest};
use crate::api::{parse_id, ValidatedJson};
use crate::database::models::{Transaction, TransactionView};
use crate::database::Repository;
use crate::error::ApiError;
use crate::handlers::protected::categories::require_category;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::policy;
use crate::state::AppState;
use crate::types::ApprovalStatus;

fn repository(state: &AppState, principal: &Principal) -> Result<Repository<Transaction>, ApiError> {
    Ok(Repository::new(state.pool.clone(), principal.workspace_scope()?))
}

async fn view(state: &AppState, workspace_id: Uuid, transaction: Transaction) -> Result<TransactionView, ApiError> {
    with_relations(&state.pool, workspace_id, vec![transaction], true)
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Transaction not found"))
}

/// GET /api/transactions/:id
pub async fn transaction_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<TransactionView> {
    let id = parse_id(&id, "Transaction")?;
    let transaction = repository(&state, &principal)?.select_404(id).await?;
    Ok(ApiResponse::success(view(&state, principal.workspace_id()?, transaction).await?))
}

/// PUT /api/transactions/:id
pub async fn transaction_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTransactionRequest>,
) -> ApiResult<TransactionView> {
    let id = parse_id(&id, "Transaction")?;
    if let Some(Some(category_id)) = req.category_id {
        require_category(&state.pool, principal.workspace_scope()?, category_id).await?;
    }

    let repo = repository(&state, &principal)?;
    let changeset = repo
        .changeset()
        .set_opt("description", req.description.map(|d| d.trim().to_string()))
        .set_opt("amount", req.amount)
        .set_opt("date", req.date)
        .set_opt("type", req.kind)
        .set_opt("currency", req.currency.map(|c| c.to_uppercase()))
        .set_opt("category_id", req.category_id);
    let transaction = repo.update_404(id, changeset).await?;

    Ok(ApiResponse::success(view(&state, principal.workspace_id()?, transaction).await?))
}

/// PATCH /api/transactions/:id - approve or reject; workspace OWNER/ADMIN only
pub async fn transaction_approve(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ApprovalRequest>,
) -> ApiResult<TransactionView> {
    policy::transaction_approval(principal.role).check("Transaction")?;
    let id = parse_id(&id, "Transaction")?;
    if req.approval_status == ApprovalStatus::Pending {
        return Err(ApiError::field("approvalStatus", "approvalStatus must be APPROVED or REJECTED"));
    }

    let repo = repository(&state, &principal)?;
    let changeset = repo
        .changeset()
        .set("approval_status", req.approval_status)
        .set("approved_by_id", principal.user_id)
        .set("approved_at", Utc::now());
    let transaction = repo.update_404(id, changeset).await?;
    tracing::info!(
        "User {} marked transaction {} as {:?}",
        principal.user_id,
        transaction.id,
        transaction.approval_status
    );

    Ok(ApiResponse::success(view(&state, principal.workspace_id()?, transaction).await?))
}

/// DELETE /api/transactions/:id
pub async fn transaction_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Transaction")?;
    repository(&state, &principal)?.delete_404(id).await?;
    Ok(message("Transaction deleted"))
}
