// handlers/protected/assets.rs - workspace asset register

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::api::validated::{not_blank, positive_amount};
use crate::api::{parse_id, ValidatedJson};
use crate::database::models::Asset;
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub name: String,
    #[serde(deserialize_with = "crate::api::params::datetime::deserialize")]
    pub purchase_date: DateTime<Utc>,
    #[validate(custom = "positive_amount")]
    pub initial_value: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::api::params::datetime::option::deserialize")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[validate(custom = "positive_amount")]
    pub initial_value: Option<Decimal>,
}

fn repository(state: &AppState, principal: &Principal) -> Result<Repository<Asset>, ApiError> {
    Ok(Repository::new(state.pool.clone(), principal.workspace_scope()?))
}

/// GET /api/assets - most recent purchases first
pub async fn asset_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<Asset>> {
    let assets = repository(&state, &principal)?
        .select_all("purchase_date DESC, id DESC")
        .await?;
    Ok(ApiResponse::success(assets))
}

/// POST /api/assets
pub async fn asset_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<CreateAssetRequest>,
) -> ApiResult<Asset> {
    let workspace_id = principal.workspace_id()?;
    let asset = sqlx::query_as::<_, Asset>(
        r#"
        INSERT INTO assets (id, workspace_id, name, purchase_date, initial_value)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(workspace_id)
    .bind(req.name.trim())
    .bind(req.purchase_date)
    .bind(req.initial_value)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created(asset))
}

/// GET /api/assets/:id
pub async fn asset_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Asset> {
    let id = parse_id(&id, "Asset")?;
    Ok(ApiResponse::success(repository(&state, &principal)?.select_404(id).await?))
}

/// PUT /api/assets/:id
pub async fn asset_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateAssetRequest>,
) -> ApiResult<Asset> {
    let id = parse_id(&id, "Asset")?;
    let repo = repository(&state, &principal)?;
    let changeset = repo
        .changeset()
        .set_opt("name", req.name.map(|n| n.trim().to_string()))
        .set_opt("purchase_date", req.purchase_date)
        .set_opt("initial_value", req.initial_value);
    Ok(ApiResponse::success(repo.update_404(id, changeset).await?))
}

/// DELETE /api/assets/:id
pub async fn asset_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Asset")?;
    repository(&state, &principal)?.delete_404(id).await?;
    Ok(message("Asset deleted"))
}
