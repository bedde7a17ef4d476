mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn member_tickets_reach_the_admin_queue() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let owner = app.user_token("owner-1");
    let admin = app.admin_token();

    let (status, _) = app
        .post("/api/support/tickets", &owner, json!({ "title": "Export klemmt" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/support/tickets",
            &app.user_token("stranger"),
            json!({ "title": "Hallo", "company_id": cid }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, ticket) = app
        .post(
            "/api/support/tickets",
            &owner,
            json!({ "title": "Export klemmt", "description": "DATEV Export bricht ab", "priority": "high", "category": "datev", "company_id": cid }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", ticket);
    assert_eq!(ticket["data"]["status"], "open");
    let ticket_uri = format!("/api/admin/tickets/{}", ticket["data"]["id"].as_str().unwrap_or_default());

    let (status, _) = app
        .post(&format!("{}/comments", ticket_uri), &admin, json!({ "body": "Kunde sperren?", "internal": true }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    app.post(&format!("{}/comments", ticket_uri), &admin, json!({ "body": "Wir schauen es uns an." }))
        .await?;

    let (_, mine) = app.get(&format!("/api/support/tickets?company_id={}", cid), &owner).await?;
    let comments = mine["data"][0]["comments"].as_array().cloned().unwrap_or_default();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["body"], "Wir schauen es uns an.");

    let (status, resolved) = app.patch(&ticket_uri, &admin, json!({ "status": "resolved" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(resolved["data"]["resolved_at"].is_string());

    let (_, high) = app.get("/api/admin/tickets?priority=high", &admin).await?;
    assert_eq!(high["data"].as_array().map(Vec::len), Some(1));

    let (status, analytics) = app.get("/api/admin/tickets/analytics?range=7d", &admin).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["data"]["range"], "7d");
    assert_eq!(analytics["data"]["total"], 1);
    assert_eq!(analytics["data"]["closed"], 1);
    assert_eq!(analytics["data"]["by_category"]["datev"], 1);

    let (status, _) = app.get("/api/admin/tickets/does-not-exist", &admin).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn workspace_progress_follows_tasks() -> Result<()> {
    let app = common::TestApp::new();
    let admin = app.admin_token();

    let (status, _) = app.post("/api/admin/workspaces", &admin, json!({ "title": "  " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, workspace) = app
        .post("/api/admin/workspaces", &admin, json!({ "title": "Onboarding Q3", "priority": "high" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/admin/workspaces/{}", workspace["data"]["id"].as_str().unwrap_or_default());

    app.post(&format!("{}/tasks", uri), &admin, json!({ "title": "Vertrag" })).await?;
    let (status, with_tasks) = app.post(&format!("{}/tasks", uri), &admin, json!({ "title": "Schulung" })).await?;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = with_tasks["data"]["tasks"][0]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(with_tasks["data"]["progress"], 0);

    let (status, done) = app
        .patch(&format!("{}/tasks/{}", uri, task_id), &admin, json!({ "status": "done" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["data"]["progress"], 50);

    let (status, commented) = app
        .post(&format!("{}/tasks/{}/comments", uri, task_id), &admin, json!({ "body": "Erledigt" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(commented["data"]["tasks"][0]["comments"][0]["body"], "Erledigt");

    let (status, _) = app
        .patch(&format!("{}/tasks/missing", uri), &admin, json!({ "status": "done" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, trimmed) = app.delete(&format!("{}/tasks/{}", uri, task_id), &admin).await?;
    assert_eq!(trimmed["data"]["progress"], 0);

    let (status, _) = app.delete(&uri, &admin).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, &admin).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn usage_job_records_counts() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let owner = app.user_token("owner-1");
    for name in ["Kunde A", "Kunde B"] {
        app.post(&format!("/api/companies/{}/data/customers", cid), &owner, json!({ "name": name }))
            .await?;
    }

    let (status, _) = app.post("/api/admin/jobs/usage", &owner, json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, run) = app.post("/api/admin/jobs/usage", &app.admin_token(), json!({})).await?;
    assert_eq!(status, StatusCode::OK, "{}", run);
    assert_eq!(run["data"]["job"], "usage");
    assert_eq!(run["data"]["processed"], 1);
    assert_eq!(run["data"]["failed"], 0);

    let (status, usage) = app.get(&format!("/api/companies/{}/usage", cid), &owner).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["data"]["counts"]["customers"], 2);
    Ok(())
}

#[tokio::test]
async fn gmail_watch_job_renews_push_mailboxes() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    app.put(
        &format!("/api/companies/{}/email/config", cid),
        &app.user_token("owner-1"),
        json!({ "provider": "gmail", "email": "info@muster.de", "access_token": "ya29", "push_enabled": true }),
    )
    .await?;

    let (status, run) = app.post("/api/admin/jobs/gmail-watch", &app.admin_token(), json!({})).await?;
    assert_eq!(status, StatusCode::OK, "{}", run);
    assert_eq!(run["data"]["processed"], 1);

    let (_, config) = app
        .get(&format!("/api/companies/{}/email/config", cid), &app.user_token("owner-1"))
        .await?;
    assert!(config["data"]["watch_expiration"].is_string());
    Ok(())
}

#[tokio::test]
async fn admins_list_all_companies() -> Result<()> {
    let app = common::TestApp::new();
    app.create_company("owner-1", "Erste GmbH").await?;
    app.create_company("owner-2", "Zweite GmbH").await?;
    let (status, body) = app.get("/api/admin/companies", &app.admin_token()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}
