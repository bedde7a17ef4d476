mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use taskilo_api::database::DocumentStore;

#[tokio::test]
async fn owner_creates_reads_and_updates_a_company() -> Result<()> {
    let app = common::TestApp::new();
    let token = app.user_token("owner-1");
    let id = app.create_company("owner-1", "Muster GmbH").await?;

    let (status, body) = app.get(&format!("/api/companies/{}", id), &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Muster GmbH");
    assert_eq!(body["data"]["owner_uid"], "owner-1");
    assert_eq!(body["data"]["locked"], false);

    let (status, body) = app
        .patch(
            &format!("/api/companies/{}", id),
            &token,
            json!({ "step3": { "taxNumber": "12/345/67890", "ust": "kleinunternehmer" }, "vatId": "DE123456789" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["tax"]["tax_number"], "12/345/67890");
    assert_eq!(body["data"]["tax"]["vat_id"], "DE123456789");
    assert_eq!(body["data"]["tax"]["small_business"], true);
    assert!(body["data"].get("step3").is_none());
    Ok(())
}

#[tokio::test]
async fn protected_fields_cannot_be_patched() -> Result<()> {
    let app = common::TestApp::new();
    let id = app.create_company("owner-1", "Muster GmbH").await?;

    let (status, body) = app
        .patch(&format!("/api/companies/{}", id), &app.user_token("owner-1"), json!({ "locked": false }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["locked"].is_string(), "{}", body);

    let (status, _) = app
        .patch(
            &format!("/api/companies/{}", id),
            &app.user_token("owner-1"),
            json!({ "platform_hold_balance_cents": 100000 }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn strangers_are_forbidden_and_members_are_not() -> Result<()> {
    let app = common::TestApp::new();
    let id = app.create_company("owner-1", "Muster GmbH").await?;

    let (status, _) = app.get(&format!("/api/companies/{}", id), &app.user_token("someone-else")).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let member = app.token("employee-1", taskilo_api::auth::Role::User, &[id.as_str()]);
    let (status, _) = app.get(&format!("/api/companies/{}", id), &member).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn locked_company_cannot_be_deleted_until_unlocked() -> Result<()> {
    let app = common::TestApp::new();
    let owner = app.user_token("owner-1");
    let admin = app.admin_token();
    let id = app.create_company("owner-1", "Muster GmbH").await?;
    app.post(&format!("/api/companies/{}/data/customers", id), &owner, json!({ "name": "Kunde AG" }))
        .await?;

    let (status, body) = app
        .post(&format!("/api/admin/companies/{}/lock", id), &admin, json!({ "reason": "Zahlungsverzug" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["locked"], true);
    assert_eq!(body["data"]["locked_reason"], "Zahlungsverzug");

    let (status, body) = app.delete(&format!("/api/companies/{}", id), &owner).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "LOCKED");

    let (status, _) = app.delete(&format!("/api/admin/companies/{}", id), &admin).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post(&format!("/api/admin/companies/{}/unlock", id), &admin, json!({})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&format!("/api/companies/{}", id), &owner).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/companies/{}", id), &owner).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let customers = app.store.count(&format!("companies/{}/customers", id), &Default::default()).await?;
    assert_eq!(customers, 0);
    Ok(())
}

#[tokio::test]
async fn unlocking_an_unlocked_company_is_a_bad_request() -> Result<()> {
    let app = common::TestApp::new();
    let id = app.create_company("owner-1", "Muster GmbH").await?;
    let (status, _) = app
        .post(&format!("/api/admin/companies/{}/unlock", id), &app.admin_token(), json!({}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
