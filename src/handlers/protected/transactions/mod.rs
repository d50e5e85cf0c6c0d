// handlers/protected/transactions/mod.rs - workspace income and expense ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::api::double_option;
use crate::api::validated::{not_blank, positive_amount};
use crate::database::models::{Category, Transaction, TransactionView, User};
use crate::database::DatabaseError;
use crate::types::{ApprovalStatus, TransactionType};

pub mod collection; // GET, POST /api/transactions
pub mod record; // GET, PUT, PATCH, DELETE /api/transactions/:id

pub use collection::{transaction_create, transaction_list};
pub use record::{transaction_approve, transaction_delete, transaction_get, transaction_update};

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub description: String,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    #[serde(deserialize_with = "crate::api::params::datetime::deserialize")]
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    #[validate(length(min = 1, max = 500), custom = "not_blank")]
    pub description: Option<String>,
    #[validate(custom = "positive_amount")]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::api::params::datetime::option::deserialize")]
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub approval_status: ApprovalStatus,
}

/// Attach categories (and, with `approvers`, the approving user) to transactions
pub async fn with_relations(
    pool: &PgPool,
    workspace_id: Uuid,
    transactions: Vec<Transaction>,
    approvers: bool,
) -> Result<Vec<TransactionView>, DatabaseError> {
    let category_ids: Vec<Uuid> = transactions.iter().filter_map(|t| t.category_id).collect();
    let categories: HashMap<Uuid, Category> = Category::find_many(pool, Some(workspace_id), &category_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let mut views = Vec::with_capacity(transactions.len());
    for transaction in transactions {
        let approved_by = match (approvers, transaction.approved_by_id) {
            (true, Some(user_id)) => User::summary(pool, user_id).await?,
            _ => None,
        };
        views.push(TransactionView {
            category: transaction.category_id.and_then(|id| categories.get(&id).cloned()),
            approved_by,
            transaction,
        });
    }
    Ok(views)
}
