use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Category, UserSummary};
use crate::database::repository::Record;
use crate::types::{ApprovalStatus, TransactionType};

/// An income or expense entry in a workspace ledger
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub date: DateTime<Utc>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category_id: Option<Uuid>,
    pub approval_status: ApprovalStatus,
    pub approved_by_id: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Transaction {
    const TABLE: &'static str = "transactions";
    const ENTITY: &'static str = "Transaction";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserSummary>,
}
