use axum::{extract::State, Extension};

use super::{ensure_unique_name, CreateCategoryRequest};
use crate::api::ValidatedJson;
use crate::database::models::category::DEFAULT_COLOR;
use crate::database::models::Category;
use crate::database::Repository;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::state::AppState;

/// GET /api/categories - every category of the workspace, by name
pub async fn category_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<Category>> {
    let repo = Repository::<Category>::new(state.pool.clone(), principal.workspace_scope()?);
    Ok(ApiResponse::success(repo.select_all("name ASC").await?))
}

/// POST /api/categories - 409 when the name is taken in this workspace
pub async fn category_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> ApiResult<Category> {
    let workspace_id = principal.workspace_id()?;
    let repo = Repository::<Category>::new(state.pool.clone(), principal.workspace_scope()?);
    let name = req.name.trim();
    ensure_unique_name(&repo, name, None).await?;

    let color = req.color.as_deref().unwrap_or(DEFAULT_COLOR);
    let category = Category::create(&state.pool, workspace_id, name, color).await?;
    tracing::debug!("Created category {} in workspace {}", category.id, workspace_id);

    Ok(ApiResponse::created(category))
}
