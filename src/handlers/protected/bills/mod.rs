// handlers/protected/bills/mod.rs - personal and team bills
//
// Visibility: the caller's own bills plus every bill of a team they belong
// to. Changes: the owner, or an OWNER/ADMIN of the bill's team.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::api::double_option;
use crate::api::validated::{not_blank, positive_amount};
use crate::database::bills::BillRepository;
use crate::database::models::Bill;
use crate::database::teams::membership;
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::policy::{self, Capability};
use crate::state::AppState;
use crate::types::RecurringPeriod;

pub mod collection; // GET, POST /api/bills
pub mod record; // GET, PATCH, DELETE /api/bills/:id

pub use collection::{bill_create, bill_list};
pub use record::{bill_delete, bill_get, bill_update};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderInput {
    pub days_before: i32,
}

fn reminder_days(reminders: &[ReminderInput]) -> Result<(), ValidationError> {
    if reminders.iter().all(|r| r.days_before > 0) {
        Ok(())
    } else {
        let mut error = ValidationError::new("reminders");
        error.message = Some("Reminder days must be positive whole numbers".into());
        Err(error)
    }
}

fn days(reminders: &[ReminderInput]) -> Vec<i32> {
    reminders.iter().map(|r| r.days_before).collect()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub name: String,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    #[serde(deserialize_with = "crate::api::params::datetime::deserialize")]
    pub due_date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurring_period: Option<RecurringPeriod>,
    pub team_id: Option<Uuid>,
    #[validate(custom = "reminder_days")]
    pub reminders: Option<Vec<ReminderInput>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(custom = "positive_amount")]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::api::params::datetime::option::deserialize")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_recurring: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurring_period: Option<Option<RecurringPeriod>>,
    #[serde(default, deserialize_with = "double_option")]
    pub team_id: Option<Option<Uuid>>,
    pub is_paid: Option<bool>,
    #[serde(default, deserialize_with = "crate::api::params::datetime::option::deserialize")]
    pub paid_at: Option<DateTime<Utc>>,
    #[validate(custom = "reminder_days")]
    pub reminders: Option<Vec<ReminderInput>>,
}

/// Assigning a bill to a team requires membership of that team
async fn require_team_member(state: &AppState, principal: &Principal, team_id: Uuid) -> Result<(), ApiError> {
    let role = membership(&state.pool, team_id, principal.user_id).await?;
    policy::team(role, policy::TeamCapability::View).check("Team")
}

/// Load a visible bill and check `capability` on it
async fn authorize(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    capability: Capability,
) -> Result<(BillRepository, Bill), ApiError> {
    let repo = BillRepository::new(state.pool.clone(), principal.user_id);
    let bill = repo
        .find_visible(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill not found"))?;

    let team_role = match bill.team_id {
        Some(team_id) => membership(&state.pool, team_id, principal.user_id).await?,
        None => None,
    };
    let grants = policy::bill_grants(principal.user_id, &bill, team_role);
    policy::bill(&grants, capability).check("Bill")?;

    Ok((repo, bill))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_dates_and_reminders() {
        let req: CreateBillRequest = serde_json::from_value(serde_json::json!({
            "name": "Rent",
            "amount": 1200.5,
            "dueDate": "2024-06-01",
            "reminders": [{ "daysBefore": 3 }, { "daysBefore": 1 }]
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(!req.is_recurring);
        assert_eq!(days(req.reminders.as_deref().unwrap_or_default()), vec![3, 1]);
    }

    #[test]
    fn non_positive_reminders_and_amounts_fail() {
        let req: CreateBillRequest = serde_json::from_value(serde_json::json!({
            "name": "Rent",
            "amount": 0,
            "dueDate": "2024-06-01T00:00:00Z",
            "reminders": [{ "daysBefore": 0 }]
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("amount"));
        assert!(fields.contains_key("reminders"));
    }

    #[test]
    fn blank_names_fail_validation() {
        let req: CreateBillRequest = serde_json::from_value(serde_json::json!({
            "name": "   ",
            "amount": 10,
            "dueDate": "2024-06-01"
        }))
        .unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("name"));

        let update: UpdateBillRequest = serde_json::from_value(serde_json::json!({ "name": " " })).unwrap();
        assert!(update.validate().is_err());
    }

    #[test]
    fn amounts_beyond_cents_columns_fail() {
        let req: CreateBillRequest = serde_json::from_value(serde_json::json!({
            "name": "Yacht",
            "amount": 1e13,
            "dueDate": "2024-06-01"
        }))
        .unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("amount"));
    }

    #[test]
    fn update_request_distinguishes_null_category() {
        let req: UpdateBillRequest = serde_json::from_value(serde_json::json!({ "categoryId": null })).unwrap();
        assert_eq!(req.category_id, Some(None));
        assert_eq!(req.team_id, None);
    }
}
