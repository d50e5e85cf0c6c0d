use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::changeset::Changeset;
use crate::database::models::{Bill, BillView, Category, Reminder, TeamRef, User};
use crate::database::teams::TeamRepository;
use crate::database::DatabaseError;
use crate::types::RecurringPeriod;

/// List filters for `GET /api/bills`
#[derive(Debug, Default, Clone)]
pub struct BillFilter {
    pub is_paid: Option<bool>,
    pub category_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    /// Half-open due date range `[start, end)`
    pub due_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub name: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub description: Option<String>,
    pub is_recurring: bool,
    pub recurring_period: Option<RecurringPeriod>,
    pub team_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub reminder_days: Vec<i32>,
}

/// Bills visible to one user: their own plus every bill of a team they belong to.
/// Mutations are narrowed further to bills the user owns or administers.
pub struct BillRepository {
    pool: PgPool,
    user_id: Uuid,
}

fn push_visible(q: &mut QueryBuilder<'static, Postgres>, user_id: Uuid) {
    q.push("(user_id = ")
        .push_bind(user_id)
        .push(" OR team_id IN (SELECT team_id FROM team_members WHERE user_id = ")
        .push_bind(user_id)
        .push("))");
}

fn push_manageable(q: &mut QueryBuilder<'static, Postgres>, user_id: Uuid) {
    q.push("(user_id = ")
        .push_bind(user_id)
        .push(" OR team_id IN (SELECT team_id FROM team_members WHERE user_id = ")
        .push_bind(user_id)
        .push(" AND role IN ('OWNER', 'ADMIN')))");
}

fn push_filters(q: &mut QueryBuilder<'static, Postgres>, filter: &BillFilter) {
    if let Some(paid) = filter.is_paid {
        q.push(" AND is_paid = ").push_bind(paid);
    }
    if let Some(category_id) = filter.category_id {
        q.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(team_id) = filter.team_id {
        q.push(" AND team_id = ").push_bind(team_id);
    }
    if let Some((start, end)) = filter.due_between {
        q.push(" AND due_date >= ").push_bind(start);
        q.push(" AND due_date < ").push_bind(end);
    }
}

async fn insert_reminders(conn: &mut PgConnection, bill_id: Uuid, days: &[i32]) -> Result<(), DatabaseError> {
    for days_before in days {
        sqlx::query("INSERT INTO reminders (id, bill_id, days_before) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(bill_id)
            .bind(days_before)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

impl BillRepository {
    pub fn new(pool: PgPool, user_id: Uuid) -> Self {
        Self { pool, user_id }
    }

    pub async fn list(&self, filter: &BillFilter, limit: i64, offset: i64) -> Result<(Vec<Bill>, i64), DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM bills WHERE ");
        push_visible(&mut count, self.user_id);
        push_filters(&mut count, filter);
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get(0)?;

        let mut q = QueryBuilder::new("SELECT * FROM bills WHERE ");
        push_visible(&mut q, self.user_id);
        push_filters(&mut q, filter);
        q.push(" ORDER BY due_date ASC, id ASC");
        q.push(" LIMIT ").push_bind(limit);
        q.push(" OFFSET ").push_bind(offset);
        let bills = q.build_query_as::<Bill>().fetch_all(&self.pool).await?;

        Ok((bills, total))
    }

    pub async fn find_visible(&self, id: Uuid) -> Result<Option<Bill>, DatabaseError> {
        let mut q = QueryBuilder::new("SELECT * FROM bills WHERE id = ");
        q.push_bind(id).push(" AND ");
        push_visible(&mut q, self.user_id);
        Ok(q.build_query_as::<Bill>().fetch_optional(&self.pool).await?)
    }

    /// Insert the bill and its reminders atomically
    pub async fn create(&self, new: NewBill) -> Result<Bill, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let bill = sqlx::query_as::<_, Bill>(
            r#"
            INSERT INTO bills
                (id, name, amount, due_date, description, is_recurring, recurring_period, user_id, team_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(new.amount)
        .bind(new.due_date)
        .bind(&new.description)
        .bind(new.is_recurring)
        .bind(new.recurring_period)
        .bind(self.user_id)
        .bind(new.team_id)
        .bind(new.category_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_reminders(&mut tx, bill.id, &new.reminder_days).await?;
        tx.commit().await?;

        Ok(bill)
    }

    /// Apply `changeset` and, when `reminder_days` is given, replace the
    /// reminder set. Rows the user cannot manage are reported as not found.
    pub async fn update(
        &self,
        id: Uuid,
        changeset: Changeset,
        reminder_days: Option<&[i32]>,
    ) -> Result<Bill, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let mut q = changeset.where_id(id);
        q.push(" AND ");
        push_manageable(&mut q, self.user_id);
        q.push(" RETURNING *");

        let bill = q
            .build_query_as::<Bill>()
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Bill"))?;

        if let Some(days) = reminder_days {
            sqlx::query("DELETE FROM reminders WHERE bill_id = $1")
                .bind(bill.id)
                .execute(&mut *tx)
                .await?;
            insert_reminders(&mut tx, bill.id, days).await?;
        }

        tx.commit().await?;
        Ok(bill)
    }

    /// Delete reminders, notifications and the bill in one transaction
    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reminders WHERE bill_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notifications WHERE bill_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let mut q = QueryBuilder::new("DELETE FROM bills WHERE id = ");
        q.push_bind(id).push(" AND ");
        push_manageable(&mut q, self.user_id);
        let result = q.build().execute(&mut *tx).await?;

        if result.rows_affected() == 0 {
            // dropping the transaction rolls back the child deletes
            return Err(DatabaseError::not_found("Bill"));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Attach category, team and reminders to each bill with one query per relation
    pub async fn with_relations(&self, bills: Vec<Bill>) -> Result<Vec<BillView>, DatabaseError> {
        let bill_ids: Vec<Uuid> = bills.iter().map(|b| b.id).collect();
        let category_ids: Vec<Uuid> = bills.iter().filter_map(|b| b.category_id).collect();
        let team_ids: Vec<Uuid> = bills.iter().filter_map(|b| b.team_id).collect();

        let categories: HashMap<Uuid, Category> = Category::find_many(&self.pool, None, &category_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let teams: HashMap<Uuid, String> = if team_ids.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM teams WHERE id = ANY($1)")
                .bind(&team_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect()
        };

        let mut reminders: HashMap<Uuid, Vec<Reminder>> = HashMap::new();
        if !bill_ids.is_empty() {
            let rows = sqlx::query_as::<_, Reminder>(
                "SELECT * FROM reminders WHERE bill_id = ANY($1) ORDER BY days_before DESC",
            )
            .bind(&bill_ids)
            .fetch_all(&self.pool)
            .await?;
            for reminder in rows {
                reminders.entry(reminder.bill_id).or_default().push(reminder);
            }
        }

        Ok(bills
            .into_iter()
            .map(|bill| BillView {
                category: bill.category_id.and_then(|id| categories.get(&id).cloned()),
                team: bill.team_id.and_then(|id| {
                    teams.get(&id).map(|name| TeamRef {
                        id,
                        name: name.clone(),
                        members: None,
                    })
                }),
                reminders: reminders.remove(&bill.id).unwrap_or_default(),
                user: None,
                bill,
            })
            .collect())
    }

    /// Single-bill view: relations plus owner and the team's member list
    pub async fn detail(&self, bill: Bill) -> Result<BillView, DatabaseError> {
        let owner = User::summary(&self.pool, bill.user_id).await?;
        let mut view = self
            .with_relations(vec![bill])
            .await?
            .pop()
            .ok_or_else(|| DatabaseError::not_found("Bill"))?;

        if let Some(team) = view.team.as_mut() {
            let members = TeamRepository::new(self.pool.clone()).members(team.id).await?;
            team.members = Some(members);
        }
        view.user = owner;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_predicate_covers_owner_and_teams() {
        let mut q = QueryBuilder::new("SELECT * FROM bills WHERE ");
        push_visible(&mut q, Uuid::nil());
        assert_eq!(
            q.sql(),
            "SELECT * FROM bills WHERE (user_id = $1 OR team_id IN (SELECT team_id FROM team_members WHERE user_id = $2))"
        );
    }

    #[test]
    fn filters_append_in_order() {
        let filter = BillFilter {
            is_paid: Some(false),
            category_id: None,
            team_id: Some(Uuid::nil()),
            due_between: Some((Utc::now(), Utc::now())),
        };
        let mut q = QueryBuilder::new("SELECT COUNT(*) FROM bills WHERE TRUE");
        push_filters(&mut q, &filter);
        assert_eq!(
            q.sql(),
            "SELECT COUNT(*) FROM bills WHERE TRUE AND is_paid = $1 AND team_id = $2 AND due_date >= $3 AND due_date < $4"
        );
    }

    #[test]
    fn manageable_predicate_requires_admin_roles() {
        let mut q = QueryBuilder::new("");
        push_manageable(&mut q, Uuid::nil());
        assert!(q.sql().ends_with("AND role IN ('OWNER', 'ADMIN')))"));
    }
}
