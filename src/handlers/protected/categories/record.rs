use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::Value;

use super::{ensure_unique_name, UpdateCategoryRequest};
use crate::api::{parse_id, ValidatedJson};
use crate::database::models::Category;
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::response::message;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;

fn repository(state: &AppState, principal: &Principal) -> Result<Repository<Category>, ApiError> {
    Ok(Repository::new(state.pool.clone(), principal.workspace_scope()?))
}

/// GET /api/categories/:id
pub async fn category_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    let id = parse_id(&id, "Category")?;
    let category = repository(&state, &principal)?.select_404(id).await?;
    Ok(ApiResponse::success(category))
}

/// PUT/PATCH /api/categories/:id
pub async fn category_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    let id = parse_id(&id, "Category")?;
    let repo = repository(&state, &principal)?;
    let name = req.name.map(|n| n.trim().to_string());
    if let Some(name) = name.as_deref() {
        ensure_unique_name(&repo, name, Some(id)).await?;
    }

    let changeset = repo.changeset().set_opt("name", name).set_opt("color", req.color);
    Ok(ApiResponse::success(repo.update_404(id, changeset).await?))
}

/// DELETE /api/categories/:id - referencing bills, transactions and
/// scheduled payments keep existing with `categoryId` cleared
pub async fn category_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Category")?;
    repository(&state, &principal)?.delete_404(id).await?;
    Ok(message("Category deleted"))
}
