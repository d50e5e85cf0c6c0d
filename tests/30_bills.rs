mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::Session;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create_bill(session: &Session, body: Value) -> Result<Value> {
    let (status, bill) = session.post("/api/bills", body).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "create bill failed: {} {}", status, bill);
    Ok(bill)
}

#[tokio::test]
async fn create_embeds_category_and_reminders() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Bill Owner").await?;
    let category_id = session.category_id("Operations").await?;

    let bill = create_bill(
        &session,
        json!({
            "name": "Office rent",
            "amount": 1250.5,
            "dueDate": (Utc::now() + Duration::days(10)).to_rfc3339(),
            "categoryId": category_id,
            "isRecurring": true,
            "recurringPeriod": "MONTHLY",
            "reminders": [{ "daysBefore": 7 }, { "daysBefore": 1 }]
        }),
    )
    .await?;

    assert_eq!(bill["amount"], 1250.5);
    assert_eq!(bill["isPaid"], false);
    assert_eq!(bill["recurringPeriod"], "MONTHLY");
    assert_eq!(bill["category"]["name"], "Operations");
    let days: Vec<i64> = bill["reminders"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["daysBefore"].as_i64())
        .collect();
    assert_eq!(days, vec![7, 1]);
    Ok(())
}

#[tokio::test]
async fn recurring_period_is_dropped_for_one_off_bills() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "One Off").await?;

    let bill = create_bill(
        &session,
        json!({ "name": "Repair", "amount": 80, "dueDate": "2030-01-15", "recurringPeriod": "YEARLY" }),
    )
    .await?;
    assert!(bill["recurringPeriod"].is_null());
    Ok(())
}

#[tokio::test]
async fn create_rejects_bad_input() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Bad Input").await?;

    let (status, body) = session
        .post("/api/bills", json!({ "name": "", "amount": -5, "dueDate": "2030-01-15" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["name"].is_string());
    assert!(body["details"]["amount"].is_string());

    let (status, body) = session
        .post(
            "/api/bills",
            json!({ "name": "Ghost", "amount": 5, "dueDate": "2030-01-15", "categoryId": uuid::Uuid::new_v4() }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["categoryId"].is_string());
    Ok(())
}

#[tokio::test]
async fn oversized_amounts_and_blank_names_are_validation_errors() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Big Spender").await?;

    let (status, body) = session
        .post("/api/bills", json!({ "name": "Yacht", "amount": 1e13, "dueDate": "2030-01-15" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"]["amount"].is_string());

    let (status, body) = session
        .post("/api/bills", json!({ "name": "   ", "amount": 5, "dueDate": "2030-01-15" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["name"].is_string());

    let bill = create_bill(&session, json!({ "name": "Boat", "amount": 999999999999.99, "dueDate": "2030-01-15" })).await?;
    let path = format!("/api/bills/{}", bill["id"].as_str().unwrap());
    let (status, _) = session.patch(&path, json!({ "amount": 1e13 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn far_pages_are_empty_rather_than_errors() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Page Turner").await?;
    create_bill(&session, json!({ "name": "Only", "amount": 5, "dueDate": "2030-01-15" })).await?;

    let (status, page) = session.get("/api/bills?page=9223372036854775807").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert!(page["bills"].as_array().unwrap().is_empty());

    for path in [
        "/api/notifications?page=999999999999999999",
        "/api/transactions?page=9223372036854775807&limit=1",
        "/api/scheduled-payments?page=9223372036854775807",
    ] {
        assert_eq!(session.get(path).await?.0, StatusCode::OK, "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn list_filters_and_paginates() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Lister").await?;

    for i in 0..3 {
        create_bill(
            &session,
            json!({ "name": format!("Bill {i}"), "amount": 10 + i, "dueDate": (Utc::now() + Duration::days(40 + i)).to_rfc3339() }),
        )
        .await?;
    }
    let soon = create_bill(
        &session,
        json!({ "name": "Due soon", "amount": 5, "dueDate": (Utc::now() + Duration::hours(1)).to_rfc3339() }),
    )
    .await?;

    let (status, page) = session.get("/api/bills?limit=2&page=1").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 4);
    assert_eq!(page["pagination"]["pages"], 2);
    assert_eq!(page["bills"].as_array().unwrap().len(), 2);
    assert_eq!(page["bills"][0]["id"], soon["id"], "ordered by due date ascending");

    let (_, paid) = session.get("/api/bills?status=paid").await?;
    assert_eq!(paid["pagination"]["total"], 0);

    let (status, _) = session.get("/api/bills?status=overdue").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = session.get("/api/bills?period=decade").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = session.get("/api/bills?categoryId=nope").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn paying_sets_and_clears_paid_at() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Payer").await?;
    let bill = create_bill(&session, json!({ "name": "Power", "amount": 60, "dueDate": "2030-02-01" })).await?;
    let path = format!("/api/bills/{}", bill["id"].as_str().unwrap());

    let (status, paid) = session.patch(&path, json!({ "isPaid": true })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["isPaid"], true);
    assert!(paid["paidAt"].is_string());

    let future = (Utc::now() + Duration::days(3)).to_rfc3339();
    let (status, _) = session.patch(&path, json!({ "isPaid": true, "paidAt": future })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, unpaid) = session.patch(&path, json!({ "isPaid": false })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unpaid["isPaid"], false);
    assert!(unpaid["paidAt"].is_null());
    Ok(())
}

#[tokio::test]
async fn reminders_are_replaced_wholesale() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Reminded").await?;
    let bill = create_bill(
        &session,
        json!({ "name": "Water", "amount": 30, "dueDate": "2030-03-01", "reminders": [{ "daysBefore": 3 }] }),
    )
    .await?;
    let path = format!("/api/bills/{}", bill["id"].as_str().unwrap());

    let (_, updated) = session
        .patch(&path, json!({ "reminders": [{ "daysBefore": 5 }, { "daysBefore": 2 }] }))
        .await?;
    assert_eq!(updated["reminders"].as_array().unwrap().len(), 2);

    let (_, cleared) = session.patch(&path, json!({ "reminders": [] })).await?;
    assert!(cleared["reminders"].as_array().unwrap().is_empty());

    let (_, untouched) = session.patch(&path, json!({ "name": "Water and sewer" })).await?;
    assert_eq!(untouched["name"], "Water and sewer");
    assert!(untouched["reminders"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn other_users_cannot_see_or_touch_a_bill() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let owner = Session::register(server, "Owner").await?;
    let stranger = Session::register(server, "Stranger").await?;
    let bill = create_bill(&owner, json!({ "name": "Private", "amount": 9, "dueDate": "2030-04-01" })).await?;
    let path = format!("/api/bills/{}", bill["id"].as_str().unwrap());

    assert_eq!(stranger.get(&path).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(stranger.patch(&path, json!({ "name": "Mine" })).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(stranger.delete(&path).await?.0, StatusCode::NOT_FOUND);

    let (_, list) = stranger.get("/api/bills").await?;
    assert_eq!(list["pagination"]["total"], 0);

    assert_eq!(owner.get("/api/bills/not-a-uuid").await?.0, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn detail_includes_owner_and_delete_cascades() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Detailer").await?;
    let bill = create_bill(
        &session,
        json!({ "name": "Internet", "amount": 45, "dueDate": "2030-05-01", "reminders": [{ "daysBefore": 2 }] }),
    )
    .await?;
    let path = format!("/api/bills/{}", bill["id"].as_str().unwrap());

    let (status, detail) = session.get(&path).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["user"]["email"], session.email.as_str());

    let (status, body) = session.delete(&path).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert_eq!(session.get(&path).await?.0, StatusCode::NOT_FOUND);
    Ok(())
}
