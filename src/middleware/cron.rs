use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Guards the elevated tier. Accepts the shared secret either in
/// `X-Cron-Secret` or as a bearer token, which is what hosted schedulers send.
pub async fn cron_secret_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.config.security.cron_secret.as_deref() {
        if !secret_matches(&headers, expected) {
            tracing::warn!("Rejected cron request with missing or wrong secret");
            return Err(ApiError::unauthorized("Invalid cron secret"));
        }
    }
    Ok(next.run(request).await)
}

fn secret_matches(headers: &HeaderMap, expected: &str) -> bool {
    let header = headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok());
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    header == Some(expected) || bearer == Some(expected)
}
