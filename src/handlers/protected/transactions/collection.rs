use axum::{
    extract::{Query, State},
    Extension,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{with_relations, CreateTransactionRequest, DEFAULT_CURRENCY};
use crate::api::{parse_enum, parse_id_filter, PageRequest, Pagination, ValidatedJson};
use crate::database::models::{Transaction, TransactionView};
use crate::database::Repository;
use crate::error::ApiError;
use crate::handlers::protected::categories::require_category;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;
use crate::types::{ApprovalStatus, TransactionType};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub approval_status: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub transactions: Vec<TransactionView>,
    pub pagination: Pagination,
}

/// GET /api/transactions - newest first
pub async fn transaction_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TransactionListQuery>,
) -> ApiResult<TransactionList> {
    let workspace_id = principal.workspace_id()?;
    let kind = parse_enum::<TransactionType>(query.kind.as_deref(), "type")?;
    let approval = parse_enum::<ApprovalStatus>(query.approval_status.as_deref(), "approvalStatus")?;
    let category_id = parse_id_filter(query.category_id.as_deref(), "categoryId")?;
    let page = PageRequest::resolve(query.page.as_deref(), query.limit.as_deref(), &state.config.api);

    let repo = Repository::<Transaction>::new(state.pool.clone(), principal.workspace_scope()?);
    let (transactions, total) = repo
        .select_page(
            |q| {
                if let Some(kind) = kind {
                    q.push(" AND type = ").push_bind(kind);
                }
                if let Some(status) = approval {
                    q.push(" AND approval_status = ").push_bind(status);
                }
                if let Some(category_id) = category_id {
                    q.push(" AND category_id = ").push_bind(category_id);
                }
            },
            "date DESC, id DESC",
            page.limit,
            page.offset(),
        )
        .await?;

    Ok(ApiResponse::success(TransactionList {
        transactions: with_relations(&state.pool, workspace_id, transactions, false).await?,
        pagination: Pagination::new(total, page),
    }))
}

/// POST /api/transactions - new entries start PENDING approval
pub async fn transaction_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<CreateTransactionRequest>,
) -> ApiResult<TransactionView> {
    let workspace_id = principal.workspace_id()?;
    if let Some(category_id) = req.category_id {
        require_category(&state.pool, principal.workspace_scope()?, category_id).await?;
    }

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (id, workspace_id, description, amount, currency, date, type, category_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(workspace_id)
    .bind(req.description.trim())
    .bind(req.amount)
    .bind(req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY).to_uppercase())
    .bind(req.date)
    .bind(req.kind)
    .bind(req.category_id)
    .fetch_one(&state.pool)
    .await?;

    tracing::debug!("Created transaction {} in workspace {}", transaction.id, workspace_id);

    let view = with_relations(&state.pool, workspace_id, vec![transaction], false)
        .await?
        .pop()
        .ok_or_else(|| ApiError::internal_server_error("Created transaction could not be loaded"))?;
    Ok(ApiResponse::created(view))
}
