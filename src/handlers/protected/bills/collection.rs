use axum::{
    extract::{Query, State},
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{days, require_team_member, CreateBillRequest};
use crate::api::{parse_id_filter, PageRequest, Pagination, ValidatedJson};
use crate::database::bills::{BillFilter, BillRepository, NewBill};
use crate::database::models::BillView;
use crate::error::ApiError;
use crate::handlers::protected::categories::require_category;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::services::bill_service::{self, Period};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillListQuery {
    pub status: Option<String>,
    pub category_id: Option<String>,
    pub team_id: Option<String>,
    pub period: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BillList {
    pub bills: Vec<BillView>,
    pub pagination: Pagination,
}

impl BillListQuery {
    fn filter(&self) -> Result<BillFilter, ApiError> {
        let is_paid = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(status) => Some(bill_service::parse_status(status)?),
            None => None,
        };
        let due_between = match self.period.as_deref().filter(|s| !s.is_empty()) {
            Some(period) => Some(bill_service::period_range(period.parse::<Period>()?, Utc::now())),
            None => None,
        };
        Ok(BillFilter {
            is_paid,
            category_id: parse_id_filter(self.category_id.as_deref(), "categoryId")?,
            team_id: parse_id_filter(self.team_id.as_deref(), "teamId")?,
            due_between,
        })
    }
}

/// GET /api/bills - visible bills, soonest due first
pub async fn bill_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<BillListQuery>,
) -> ApiResult<BillList> {
    let filter = query.filter()?;
    let page = PageRequest::resolve(query.page.as_deref(), query.limit.as_deref(), &state.config.api);

    let repo = BillRepository::new(state.pool.clone(), principal.user_id);
    let (bills, total) = repo.list(&filter, page.limit, page.offset()).await?;
    let bills = repo.with_relations(bills).await?;

    Ok(ApiResponse::success(BillList {
        bills,
        pagination: Pagination::new(total, page),
    }))
}

/// POST /api/bills - create a bill with its reminders
pub async fn bill_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<CreateBillRequest>,
) -> ApiResult<BillView> {
    if let Some(team_id) = req.team_id {
        require_team_member(&state, &principal, team_id).await?;
    }
    if let Some(category_id) = req.category_id {
        require_category(&state.pool, principal.workspace_scope()?, category_id).await?;
    }

    let repo = BillRepository::new(state.pool.clone(), principal.user_id);
    let bill = repo
        .create(NewBill {
            name: req.name.trim().to_string(),
            amount: req.amount,
            due_date: req.due_date,
            description: req.description,
            is_recurring: req.is_recurring,
            recurring_period: if req.is_recurring { req.recurring_period } else { None },
            team_id: req.team_id,
            category_id: req.category_id,
            reminder_days: req.reminders.as_deref().map(days).unwrap_or_default(),
        })
        .await?;
    tracing::info!("User {} created bill {}", principal.user_id, bill.id);

    let view = repo
        .with_relations(vec![bill])
        .await?
        .pop()
        .ok_or_else(|| ApiError::internal_server_error("Created bill could not be loaded"))?;
    Ok(ApiResponse::created(view))
}
