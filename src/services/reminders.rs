//! Payment reminder sweep.
//!
//! Reminders are claimed (their `sent_at` stamped and one `PENDING` dispatch
//! row written per recipient) in a committed transaction before any email is
//! sent. A retried or concurrent sweep therefore never sends the same
//! reminder twice; a crash between claim and send leaves `PENDING` rows
//! behind instead of duplicate mail.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::database::models::Notification;
use crate::database::DatabaseError;
use crate::services::mailer::{EmailMessage, Mailer};
use crate::types::{DispatchStatus, NotificationType};

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, FromRow)]
struct DueReminder {
    reminder_id: Uuid,
    days_before: i32,
    bill_id: Uuid,
    bill_name: String,
    amount: Decimal,
    due_date: DateTime<Utc>,
    user_id: Uuid,
    team_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
struct Recipient {
    user_id: Uuid,
    email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub bill_id: Uuid,
    pub reminder_id: Uuid,
    pub recipient: String,
    pub status: DispatchStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub success: bool,
    pub notifications_sent: usize,
    pub failed: usize,
    pub results: Vec<DispatchResult>,
}

/// Whole days until `due`, rounded up. Anything due later today counts as one day.
pub fn days_until_due(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (due - now).num_milliseconds();
    (millis + MILLIS_PER_DAY - 1).div_euclid(MILLIS_PER_DAY)
}

pub fn should_dispatch(days_until_due: i64, days_before: i32) -> bool {
    days_until_due <= i64::from(days_before)
}

fn day_word(days: i64) -> &'static str {
    if days == 1 {
        "day"
    } else {
        "days"
    }
}

pub fn reminder_text(bill_name: &str, amount: Decimal, days: i64) -> String {
    let when = if days <= 0 {
        "today".to_string()
    } else {
        format!("in {} {}", days, day_word(days))
    };
    format!(
        "Reminder: the bill \"{}\" for {} is due {}. Please make sure it is paid on time.",
        bill_name,
        amount.round_dp(2),
        when
    )
}

/// Bill names are user input; the HTML body carries them escaped
pub fn reminder_email(to: &str, bill_name: &str, text: &str, app_url: &str) -> EmailMessage {
    let subject = format!("Payment Reminder: {}", bill_name);
    let html = format!(
        concat!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">",
            "<h1>BillSmart</h1><h2>{subject}</h2><p>{text}</p>",
            "<p><a href=\"{url}/dashboard\">Open your dashboard</a></p>",
            "</div>"
        ),
        subject = ammonia::clean_text(&subject),
        text = ammonia::clean_text(text),
        url = app_url.trim_end_matches('/'),
    );
    EmailMessage {
        to: to.to_string(),
        subject,
        text: text.to_string(),
        html,
    }
}

async fn due_reminders(
    pool: &PgPool,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Result<Vec<DueReminder>, DatabaseError> {
    Ok(sqlx::query_as::<_, DueReminder>(
        r#"
        SELECT r.id AS reminder_id, r.days_before, b.id AS bill_id, b.name AS bill_name,
               b.amount, b.due_date, b.user_id, b.team_id
        FROM reminders r
        JOIN bills b ON b.id = r.bill_id
        WHERE r.sent_at IS NULL
          AND b.is_paid = FALSE
          AND b.due_date >= $1
          AND b.due_date <= $2
        ORDER BY b.due_date ASC, r.days_before DESC
        "#,
    )
    .bind(now)
    .bind(now + Duration::days(horizon_days))
    .fetch_all(pool)
    .await?)
}

/// Team bills go to every member with notifications on; personal bills to
/// the owner when they have email notifications enabled.
async fn recipients(pool: &PgPool, reminder: &DueReminder) -> Result<Vec<Recipient>, DatabaseError> {
    let rows = match reminder.team_id {
        Some(team_id) => {
            sqlx::query_as::<_, Recipient>(
                r#"
                SELECT u.id AS user_id, u.email FROM team_members tm
                JOIN users u ON u.id = tm.user_id
                WHERE tm.team_id = $1 AND tm.notifications_enabled AND u.email <> ''
                ORDER BY tm.joined_at
                "#,
            )
            .bind(team_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Recipient>(
                "SELECT id AS user_id, email FROM users WHERE id = $1 AND email_notifications AND email <> ''",
            )
            .bind(reminder.user_id)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Stamp the reminder and record one pending dispatch per recipient.
/// Returns false when another sweep claimed it first.
async fn claim(
    pool: &PgPool,
    reminder_id: Uuid,
    recipients: &[Recipient],
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query("UPDATE reminders SET sent_at = $2 WHERE id = $1 AND sent_at IS NULL")
        .bind(reminder_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if claimed == 0 {
        return Ok(false);
    }

    for recipient in recipients {
        sqlx::query(
            r#"
            INSERT INTO reminder_dispatches (id, reminder_id, recipient_email, user_id, status, attempted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (reminder_id, recipient_email) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(reminder_id)
        .bind(&recipient.email)
        .bind(recipient.user_id)
        .bind(DispatchStatus::Pending)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

async fn complete(
    pool: &PgPool,
    reminder_id: Uuid,
    email: &str,
    status: DispatchStatus,
    error: Option<String>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE reminder_dispatches SET status = $3, error = $4, completed_at = now()
        WHERE reminder_id = $1 AND recipient_email = $2
        "#,
    )
    .bind(reminder_id)
    .bind(email)
    .bind(status)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Run one sweep at `now`. Delivery failures are recorded per dispatch and
/// never abort the sweep; only database failures do.
pub async fn sweep(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &NotificationConfig,
    now: DateTime<Utc>,
) -> Result<SweepReport, DatabaseError> {
    let candidates = due_reminders(pool, now, config.horizon_days).await?;
    tracing::info!("Reminder sweep found {} unsent reminders in range", candidates.len());

    let mut results = Vec::new();

    for reminder in candidates {
        let days = days_until_due(reminder.due_date, now);
        if !should_dispatch(days, reminder.days_before) {
            continue;
        }

        let recipients = recipients(pool, &reminder).await?;
        if recipients.is_empty() {
            tracing::debug!("Reminder {} has no recipients yet", reminder.reminder_id);
            continue;
        }
        if !claim(pool, reminder.reminder_id, &recipients, now).await? {
            tracing::debug!("Reminder {} already claimed", reminder.reminder_id);
            continue;
        }

        let text = reminder_text(&reminder.bill_name, reminder.amount, days);
        for recipient in recipients {
            let message = reminder_email(&recipient.email, &reminder.bill_name, &text, &config.app_url);
            let status = match mailer.send(&message).await {
                Ok(()) => {
                    complete(pool, reminder.reminder_id, &recipient.email, DispatchStatus::Sent, None).await?;
                    Notification::create(
                        pool,
                        recipient.user_id,
                        Some(reminder.bill_id),
                        reminder.team_id,
                        NotificationType::PaymentDue,
                        &text,
                    )
                    .await?;
                    DispatchStatus::Sent
                }
                Err(e) => {
                    tracing::warn!("Reminder email to {} failed: {}", recipient.email, e);
                    complete(
                        pool,
                        reminder.reminder_id,
                        &recipient.email,
                        DispatchStatus::Failed,
                        Some(e.to_string()),
                    )
                    .await?;
                    DispatchStatus::Failed
                }
            };
            results.push(DispatchResult {
                bill_id: reminder.bill_id,
                reminder_id: reminder.reminder_id,
                recipient: recipient.email,
                status,
            });
        }
    }

    let sent = results.iter().filter(|r| r.status == DispatchStatus::Sent).count();
    let failed = results.len() - sent;
    tracing::info!("Reminder sweep sent {} emails, {} failed", sent, failed);

    Ok(SweepReport {
        success: true,
        notifications_sent: sent,
        failed,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn days_round_up() {
        assert_eq!(days_until_due(at(10, 12), at(10, 9)), 1);
        assert_eq!(days_until_due(at(12, 9), at(10, 9)), 2);
        assert_eq!(days_until_due(at(12, 10), at(10, 9)), 3);
        assert_eq!(days_until_due(at(10, 9), at(10, 9)), 0);
    }

    #[test]
    fn dispatch_threshold() {
        assert!(should_dispatch(3, 3));
        assert!(should_dispatch(1, 3));
        assert!(!should_dispatch(4, 3));
    }

    #[test]
    fn reminder_wording() {
        let text = reminder_text("Rent", Decimal::new(120000, 2), 1);
        assert!(text.contains("\"Rent\""));
        assert!(text.contains("1200.00"));
        assert!(text.contains("in 1 day."));
        assert!(reminder_text("Rent", Decimal::ONE, 3).contains("in 3 days"));
        assert!(reminder_text("Rent", Decimal::ONE, 0).contains("due today"));
    }

    #[test]
    fn email_subject_and_link() {
        let email = reminder_email("ann@example.com", "Rent", "due soon", "https://app.example.com/");
        assert_eq!(email.subject, "Payment Reminder: Rent");
        assert!(email.html.contains("https://app.example.com/dashboard"));
        assert_eq!(email.text, "due soon");
    }

    #[test]
    fn bill_names_are_escaped_in_html() {
        let name = "<a href=\"https://evil.example\">Rent</a> & co";
        let text = reminder_text(name, Decimal::ONE, 2);
        let email = reminder_email("ann@example.com", name, &text, "https://app.example.com");

        assert!(!email.html.contains("<a href=\"https://evil.example\">"));
        assert!(!email.html.contains("& co"));
        assert!(email.html.contains("&lt;a"));
        assert!(email.html.contains("https://app.example.com/dashboard"));
        assert_eq!(email.subject, format!("Payment Reminder: {}", name));
    }
}
