mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn customers_are_numbered_merged_and_deleted() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let token = app.user_token("owner-1");
    let base = format!("/api/companies/{}/data/customers", cid);

    let (status, created) = app.post(&base, &token, json!({ "name": "Kunde AG", "city": "Hamburg" })).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["data"]["customer_number"], "KD-1001");
    let id = created["data"]["id"].as_str().unwrap_or_default().to_string();
    let record = format!("{}/{}", base, id);

    let (_, second) = app.post(&base, &token, json!({ "name": "Zweite GmbH" })).await?;
    assert_eq!(second["data"]["customer_number"], "KD-1002");

    let (status, merged) = app.patch(&record, &token, json!({ "city": "Bremen" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["data"]["name"], "Kunde AG");
    assert_eq!(merged["data"]["city"], "Bremen");

    let (status, list) = app.get(&base, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().map(Vec::len), Some(2));

    let (status, _) = app.delete(&record, &token).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.get(&record, &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn system_fields_and_unknown_collections_are_rejected() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let token = app.user_token("owner-1");

    let (status, body) = app
        .post(
            &format!("/api/companies/{}/data/customers", cid),
            &token,
            json!({ "name": "Kunde AG", "company_id": "someone-else" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["company_id"].is_string(), "{}", body);

    let (status, _) = app
        .post(&format!("/api/companies/{}/data/invoices", cid), &token, json!({ "name": "x" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get(&format!("/api/companies/{}/data/secrets", cid), &token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let record = format!("/api/companies/{}/data/secrets/missing", cid);
    let (status, _) = app.put(&record, &token, json!({ "name": "x" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.patch(&record, &token, json!({ "name": "x" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app.delete(&record, &token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["collection"].is_string(), "{}", body);
    Ok(())
}

#[tokio::test]
async fn data_is_scoped_to_the_company() -> Result<()> {
    let app = common::TestApp::new();
    let mine = app.create_company("owner-1", "Muster GmbH").await?;
    let theirs = app.create_company("owner-2", "Andere GmbH").await?;

    let (status, _) = app
        .post(
            &format!("/api/companies/{}/data/customers", theirs),
            &app.user_token("owner-1"),
            json!({ "name": "Kunde AG" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.post(
        &format!("/api/companies/{}/data/customers", mine),
        &app.user_token("owner-1"),
        json!({ "name": "Kunde AG" }),
    )
    .await?;
    let (_, list) = app
        .get(&format!("/api/companies/{}/data/customers", theirs), &app.user_token("owner-2"))
        .await?;
    assert_eq!(list["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}
