use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Category, TeamRef, UserSummary};
use crate::types::RecurringPeriod;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub description: Option<String>,
    pub is_recurring: bool,
    pub recurring_period: Option<RecurringPeriod>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub days_before: i32,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A bill with the relations the API embeds alongside it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillView {
    #[serde(flatten)]
    pub bill: Bill,
    pub category: Option<Category>,
    pub team: Option<TeamRef>,
    pub reminders: Vec<Reminder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}
