use axum::extract::State;
use chrono::Utc;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::reminders::{self, SweepReport};
use crate::state::AppState;

/// GET /api/notifications/send - run one reminder sweep
pub async fn notifications_send(State(state): State<AppState>) -> ApiResult<SweepReport> {
    let report = reminders::sweep(&state.pool, state.mailer.as_ref(), &state.config.notifications, Utc::now()).await?;
    Ok(ApiResponse::success(report))
}
