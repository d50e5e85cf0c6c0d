// handlers/protected/scheduled_payments.rs - upcoming outgoing payments

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::api::validated::{not_blank, positive_amount};
use crate::api::{double_option, parse_id, PageRequest, Pagination, ValidatedJson};
use crate::database::models::ScheduledPayment;
use crate::database::Repository;
use crate::error::ApiError;
use crate::handlers::protected::categories::require_category;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;
use crate::types::RecurringPeriod;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduledPaymentRequest {
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub description: String,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[serde(deserialize_with = "crate::api::params::datetime::deserialize")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    pub frequency: Option<RecurringPeriod>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduledPaymentRequest {
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub description: Option<String>,
    #[validate(custom = "positive_amount")]
    pub amount: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "crate::api::params::datetime::option::deserialize")]
    pub due_date: Option<DateTime<Utc>>,
    pub is_recurring: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub frequency: Option<Option<RecurringPeriod>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduledPaymentListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPaymentList {
    pub scheduled_payments: Vec<ScheduledPayment>,
    pub pagination: Pagination,
}

fn repository(state: &AppState, principal: &Principal) -> Result<Repository<ScheduledPayment>, ApiError> {
    Ok(Repository::new(state.pool.clone(), principal.workspace_scope()?))
}

/// GET /api/scheduled-payments - soonest due first
pub async fn scheduled_payment_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ScheduledPaymentListQuery>,
) -> ApiResult<ScheduledPaymentList> {
    let page = PageRequest::resolve(query.page.as_deref(), query.limit.as_deref(), &state.config.api);
    let (scheduled_payments, total) = repository(&state, &principal)?
        .select_page(|_| {}, "due_date ASC, id ASC", page.limit, page.offset())
        .await?;

    Ok(ApiResponse::success(ScheduledPaymentList {
        scheduled_payments,
        pagination: Pagination::new(total, page),
    }))
}

/// POST /api/scheduled-payments
pub async fn scheduled_payment_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<CreateScheduledPaymentRequest>,
) -> ApiResult<ScheduledPayment> {
    let workspace_id = principal.workspace_id()?;
    if let Some(category_id) = req.category_id {
        require_category(&state.pool, principal.workspace_scope()?, category_id).await?;
    }

    let payment = sqlx::query_as::<_, ScheduledPayment>(
        r#"
        INSERT INTO scheduled_payments
            (id, workspace_id, description, amount, currency, due_date, is_recurring, frequency, category_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(workspace_id)
    .bind(req.description.trim())
    .bind(req.amount)
    .bind(req.currency.to_uppercase())
    .bind(req.due_date)
    .bind(req.is_recurring)
    .bind(if req.is_recurring { req.frequency } else { None })
    .bind(req.category_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(payment))
}

/// GET /api/scheduled-payments/:id
pub async fn scheduled_payment_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<ScheduledPayment> {
    let id = parse_id(&id, "Scheduled payment")?;
    Ok(ApiResponse::success(repository(&state, &principal)?.select_404(id).await?))
}

/// PUT /api/scheduled-payments/:id
pub async fn scheduled_payment_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateScheduledPaymentRequest>,
) -> ApiResult<ScheduledPayment> {
    let id = parse_id(&id, "Scheduled payment")?;
    if let Some(Some(category_id)) = req.category_id {
        require_category(&state.pool, principal.workspace_scope()?, category_id).await?;
    }

    let repo = repository(&state, &principal)?;
    let mut changeset = repo
        .changeset()
        .set_opt("description", req.description.map(|d| d.trim().to_string()))
        .set_opt("amount", req.amount)
        .set_opt("currency", req.currency.map(|c| c.to_uppercase()))
        .set_opt("due_date", req.due_date)
        .set_opt("is_recurring", req.is_recurring)
        .set_opt("category_id", req.category_id);

    // a frequency only means something on a recurring payment
    let recurring = match req.is_recurring {
        Some(recurring) => recurring,
        None if req.frequency.is_some() => repo.select_404(id).await?.is_recurring,
        None => false,
    };
    changeset = if recurring {
        changeset.set_opt("frequency", req.frequency)
    } else if req.is_recurring == Some(false) || req.frequency.is_some() {
        changeset.set("frequency", None::<RecurringPeriod>)
    } else {
        changeset
    };

    Ok(ApiResponse::success(repo.update_404(id, changeset).await?))
}

/// DELETE /api/scheduled-payments/:id
pub async fn scheduled_payment_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Scheduled payment")?;
    repository(&state, &principal)?.delete_404(id).await?;
    Ok(message("Scheduled payment deleted"))
}
