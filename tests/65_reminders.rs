mod common;

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::Session;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use billsmart_api::database::DatabaseManager;
use billsmart_api::services::mailer::{EmailMessage, Mailer, MailerError};
use billsmart_api::services::reminders;
use billsmart_api::types::DispatchStatus;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    reject: Option<String>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        if self.reject.as_deref() == Some(message.to.as_str()) {
            return Err(MailerError::Rejected {
                status: 400,
                body: "invalid recipient".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Each test sweeps its own far-future window so sweeps never claim each other's reminders
fn window(year: i32) -> (DateTime<Utc>, String) {
    let now = Utc.with_ymd_and_hms(year, 3, 1, 9, 0, 0).unwrap();
    (now, (now + Duration::days(2)).to_rfc3339())
}

#[tokio::test]
async fn personal_bill_reminder_is_sent_and_notified() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Sweep Solo").await?;
    let (now, due) = window(2091);

    let (status, bill) = session
        .post(
            "/api/bills",
            json!({ "name": "Mortgage", "amount": 1500, "dueDate": due, "reminders": [{ "daysBefore": 2 }] }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let bill_id: Uuid = bill["id"].as_str().unwrap().parse()?;

    let pool = DatabaseManager::connect(&server.config.database).await?;
    let mailer = RecordingMailer::default();
    let report = reminders::sweep(&pool, &mailer, &server.config.notifications, now).await?;

    let ours: Vec<_> = report.results.iter().filter(|r| r.bill_id == bill_id).collect();
    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0].status, DispatchStatus::Sent);

    let sent = mailer.sent.lock().unwrap().clone();
    let email = sent.iter().find(|m| m.to == session.email).expect("reminder email");
    assert_eq!(email.subject, "Payment Reminder: Mortgage");
    assert!(email.text.contains("in 2 days"));

    let (_, notifications) = session.get("/api/notifications").await?;
    assert_eq!(notifications["notifications"][0]["type"], "PAYMENT_DUE");
    assert_eq!(notifications["notifications"][0]["billId"], bill["id"]);

    let again = reminders::sweep(&pool, &mailer, &server.config.notifications, now).await?;
    assert!(again.results.iter().all(|r| r.bill_id != bill_id));
    Ok(())
}

#[tokio::test]
async fn team_bill_reminds_every_opted_in_member() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let owner = Session::register(server, "Sweep Owner").await?;
    let quiet = Session::register(server, "Sweep Quiet").await?;
    let bounced = Session::register(server, "Sweep Bounced").await?;
    let (now, due) = window(2093);

    let (_, team) = owner
        .post(
            "/api/teams",
            json!({
                "name": "Household",
                "members": [
                    { "email": quiet.email, "role": "MEMBER" },
                    { "email": bounced.email, "role": "MEMBER" }
                ]
            }),
        )
        .await?;
    let quiet_row = team["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["user"]["email"] == quiet.email.as_str())
        .unwrap();
    let (status, _) = quiet
        .patch(
            &format!("/api/teams/{}/members/{}", team["id"].as_str().unwrap(), quiet_row["id"].as_str().unwrap()),
            json!({ "notificationsEnabled": false }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, bill) = owner
        .post(
            "/api/bills",
            json!({ "name": "Groceries", "amount": 220, "dueDate": due, "teamId": team["id"], "reminders": [{ "daysBefore": 5 }] }),
        )
        .await?;
    let bill_id: Uuid = bill["id"].as_str().unwrap().parse()?;

    let pool = DatabaseManager::connect(&server.config.database).await?;
    let mailer = RecordingMailer {
        reject: Some(bounced.email.clone()),
        ..Default::default()
    };
    let report = reminders::sweep(&pool, &mailer, &server.config.notifications, now).await?;

    let mut ours: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.bill_id == bill_id)
        .map(|r| (r.recipient.clone(), r.status))
        .collect();
    ours.sort_by(|a, b| a.0.cmp(&b.0));
    let mut expected = vec![
        (owner.email.clone(), DispatchStatus::Sent),
        (bounced.email.clone(), DispatchStatus::Failed),
    ];
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(ours, expected);
    assert!(report.failed >= 1);

    let (_, quiet_notifications) = quiet.get("/api/notifications").await?;
    let payment_due = quiet_notifications["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["type"] == "PAYMENT_DUE")
        .count();
    assert_eq!(payment_due, 0);
    Ok(())
}
