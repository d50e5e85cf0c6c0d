use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::Record;
use crate::types::RecurringPeriod;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPayment {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: DateTime<Utc>,
    pub is_recurring: bool,
    pub frequency: Option<RecurringPeriod>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for ScheduledPayment {
    const TABLE: &'static str = "scheduled_payments";
    const ENTITY: &'static str = "Scheduled payment";
}
