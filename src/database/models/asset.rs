use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::Record;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub purchase_date: DateTime<Utc>,
    pub initial_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Asset {
    const TABLE: &'static str = "assets";
    const ENTITY: &'static str = "Asset";
}
