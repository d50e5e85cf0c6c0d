// handlers/protected/categories/mod.rs - workspace categories

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::api::validated::{hex_color, not_blank};
use crate::database::models::Category;
use crate::database::{Repository, Scope};
use crate::error::ApiError;

pub mod collection; // GET, POST /api/categories
pub mod record; // GET, PUT, PATCH, DELETE /api/categories/:id

pub use collection::{category_create, category_list};
pub use record::{category_delete, category_get, category_update};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 50), custom = "not_blank")]
    pub name: String,
    #[validate(custom = "hex_color")]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 50), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(custom = "hex_color")]
    pub color: Option<String>,
}

/// Reject a name already used by another category of the workspace
async fn ensure_unique_name(repo: &Repository<Category>, name: &str, except: Option<Uuid>) -> Result<(), ApiError> {
    let name = name.to_string();
    let taken = repo
        .count_where(move |q| {
            q.push(" AND lower(name) = lower(").push_bind(name.clone()).push(")");
            if let Some(id) = except {
                q.push(" AND id <> ").push_bind(id);
            }
        })
        .await?;
    if taken > 0 {
        return Err(ApiError::conflict("A category with this name already exists"));
    }
    Ok(())
}

/// A `categoryId` in a request body must name a category of the caller's workspace
pub async fn require_category(pool: &PgPool, scope: Scope, category_id: Uuid) -> Result<(), ApiError> {
    let found = Repository::<Category>::new(pool.clone(), scope)
        .count_ids(&[category_id])
        .await?;
    if found == 0 {
        return Err(ApiError::field("categoryId", "Category not found"));
    }
    Ok(())
}
