use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, Principal};

/// GET /api/auth/whoami - the resolved session
pub async fn whoami(Extension(principal): Extension<Principal>) -> ApiResult<Principal> {
    Ok(ApiResponse::success(principal))
}
