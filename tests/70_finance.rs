mod common;

use anyhow::Result;
use common::Session;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn transactions_start_pending_and_get_approved() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Ledger Keeper").await?;
    let category_id = session.category_id("Marketing").await?;

    let (status, tx) = session
        .post(
            "/api/transactions",
            json!({ "description": "Ad campaign", "amount": 499.99, "date": "2024-04-02", "type": "EXPENSE", "categoryId": category_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{tx}");
    assert_eq!(tx["approvalStatus"], "PENDING");
    assert_eq!(tx["currency"], "USD");
    assert_eq!(tx["category"]["name"], "Marketing");
    let path = format!("/api/transactions/{}", tx["id"].as_str().unwrap());

    let (status, _) = session.patch(&path, json!({ "approvalStatus": "PENDING" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, approved) = session.patch(&path, json!({ "approvalStatus": "APPROVED" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["approvalStatus"], "APPROVED");
    assert_eq!(approved["approvedById"], session.user["id"]);
    assert!(approved["approvedAt"].is_string());
    assert_eq!(approved["approvedBy"]["email"], session.email.as_str());
    Ok(())
}

#[tokio::test]
async fn transaction_list_filters_by_type() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Filterer").await?;

    for (description, kind, date) in [
        ("Invoice 1", "INCOME", "2024-01-10"),
        ("Invoice 2", "INCOME", "2024-02-10"),
        ("Hosting", "EXPENSE", "2024-03-10"),
    ] {
        let (status, _) = session
            .post(
                "/api/transactions",
                json!({ "description": description, "amount": 100, "date": date, "type": kind, "currency": "eur" }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, all) = session.get("/api/transactions").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["pagination"]["total"], 3);
    assert_eq!(all["transactions"][0]["description"], "Hosting", "newest first");
    assert_eq!(all["transactions"][0]["currency"], "EUR");

    let (_, income) = session.get("/api/transactions?type=INCOME").await?;
    assert_eq!(income["pagination"]["total"], 2);

    let (_, pending) = session.get("/api/transactions?approvalStatus=PENDING&limit=1").await?;
    assert_eq!(pending["pagination"]["total"], 3);
    assert_eq!(pending["pagination"]["pages"], 3);

    let (status, _) = session.get("/api/transactions?type=REFUND").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn transactions_update_and_stay_in_their_workspace() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let owner = Session::register(server, "Tx Owner").await?;
    let other = Session::register(server, "Tx Other").await?;

    let (_, tx) = owner
        .post("/api/transactions", json!({ "description": "Coffee", "amount": 4.5, "date": "2024-05-01", "type": "EXPENSE" }))
        .await?;
    let path = format!("/api/transactions/{}", tx["id"].as_str().unwrap());

    let (status, updated) = owner.put(&path, json!({ "description": "Team coffee", "amount": 18 })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Team coffee");
    assert_eq!(updated["amount"], 18.0);

    assert_eq!(other.get(&path).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(other.put(&path, json!({ "amount": 1 })).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(other.patch(&path, json!({ "approvalStatus": "APPROVED" })).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(other.delete(&path).await?.0, StatusCode::NOT_FOUND);

    assert_eq!(owner.delete(&path).await?.0, StatusCode::OK);
    assert_eq!(owner.get(&path).await?.0, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn assets_crud() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Asset Holder").await?;

    let (status, _) = session
        .post("/api/assets", json!({ "name": "Laptop", "purchaseDate": "2024-01-15", "initialValue": 0 }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, laptop) = session
        .post("/api/assets", json!({ "name": "Laptop", "purchaseDate": "2024-01-15", "initialValue": 2400 }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (_, _desk) = session
        .post("/api/assets", json!({ "name": "Desk", "purchaseDate": "2023-06-01", "initialValue": 300 }))
        .await?;

    let (_, assets) = session.get("/api/assets").await?;
    let names: Vec<&str> = assets.as_array().unwrap().iter().filter_map(|a| a["name"].as_str()).collect();
    assert_eq!(names, ["Laptop", "Desk"]);

    let path = format!("/api/assets/{}", laptop["id"].as_str().unwrap());
    let (status, renamed) = session.put(&path, json!({ "name": "Work laptop" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Work laptop");
    assert_eq!(renamed["initialValue"], 2400.0);

    assert_eq!(session.delete(&path).await?.0, StatusCode::OK);
    assert_eq!(session.get(&path).await?.0, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn scheduled_payments_paginate_by_due_date() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Scheduler").await?;

    for (description, due) in [("Quarterly tax", "2030-04-15"), ("Payroll", "2030-03-31"), ("License", "2030-05-01")] {
        let (status, payment) = session
            .post(
                "/api/scheduled-payments",
                json!({ "description": description, "amount": 1000, "currency": "USD", "dueDate": due }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "{payment}");
        assert_eq!(payment["isRecurring"], false);
    }

    let (status, page) = session.get("/api/scheduled-payments?limit=2").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 3);
    let first = &page["scheduledPayments"][0];
    assert_eq!(first["description"], "Payroll");

    let path = format!("/api/scheduled-payments/{}", first["id"].as_str().unwrap());
    let (status, updated) = session
        .put(&path, json!({ "isRecurring": true, "frequency": "MONTHLY" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["frequency"], "MONTHLY");

    let (status, _) = session
        .post("/api/scheduled-payments", json!({ "description": "No currency", "amount": 5, "dueDate": "2030-01-01" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(session.delete(&path).await?.0, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn one_off_payments_carry_no_frequency() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "One Off Payer").await?;

    let (status, payment) = session
        .post(
            "/api/scheduled-payments",
            json!({ "description": "Audit", "amount": 250, "currency": "eur", "dueDate": "2030-02-01", "frequency": "YEARLY" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{payment}");
    assert!(payment["frequency"].is_null());
    assert_eq!(payment["currency"], "EUR");
    let path = format!("/api/scheduled-payments/{}", payment["id"].as_str().unwrap());

    let (_, updated) = session.put(&path, json!({ "frequency": "MONTHLY" })).await?;
    assert!(updated["frequency"].is_null());

    let (_, updated) = session.put(&path, json!({ "isRecurring": true, "frequency": "MONTHLY" })).await?;
    assert_eq!(updated["frequency"], "MONTHLY");

    let (_, updated) = session.put(&path, json!({ "isRecurring": false })).await?;
    assert_eq!(updated["isRecurring"], false);
    assert!(updated["frequency"].is_null());
    Ok(())
}

#[tokio::test]
async fn oversized_finance_amounts_are_rejected() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let session = Session::register(server, "Whale").await?;

    let (status, body) = session
        .post(
            "/api/transactions",
            json!({ "description": "Too much", "amount": 1e13, "date": "2024-04-02", "type": "INCOME" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["amount"].is_string());

    let (status, _) = session
        .post("/api/assets", json!({ "name": "Island", "purchaseDate": "2024-01-01", "initialValue": 1e13 }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = session
        .post("/api/transactions", json!({ "description": "  ", "amount": 5, "date": "2024-04-02", "type": "INCOME" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
