mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

fn invoice_body() -> Value {
    json!({
        "customer_name": "Kunde AG",
        "customer_email": "buchhaltung@kunde.de",
        "items": [{ "description": "Beratung", "quantity": "2", "unit_price": "100" }]
    })
}

async fn setup() -> Result<(common::TestApp, String, String)> {
    let app = common::TestApp::new();
    let id = app.create_company("owner-1", "Muster GmbH").await?;
    let token = app.user_token("owner-1");
    Ok((app, id, token))
}

#[tokio::test]
async fn invoices_are_numbered_and_totalled() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let uri = format!("/api/companies/{}/documents/invoices", cid);

    let (status, first) = app.post(&uri, &token, invoice_body()).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["data"]["number"], "RE-1");
    assert_eq!(first["data"]["status"], "draft");
    assert_eq!(first["data"]["totals"]["net"], "200.00");
    assert_eq!(first["data"]["totals"]["tax"], "38.00");
    assert_eq!(first["data"]["totals"]["gross"], "238.00");

    let (_, second) = app.post(&uri, &token, invoice_body()).await?;
    assert_eq!(second["data"]["number"], "RE-2");

    let (status, list) = app.get(&uri, &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().map(Vec::len), Some(2));

    let (status, body) = app.post(&uri, &token, json!({ "customer_name": "Kunde AG", "items": [] })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["items"].is_string());
    Ok(())
}

#[tokio::test]
async fn sending_mails_the_customer_and_locks_the_draft() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let (_, created) = app
        .post(&format!("/api/companies/{}/documents/invoices", cid), &token, invoice_body())
        .await?;
    let id = created["data"]["id"].as_str().unwrap_or_default().to_string();
    let doc_uri = format!("/api/companies/{}/documents/invoices/{}", cid, id);

    let (status, sent) = app.post(&format!("{}/send", doc_uri), &token, json!({})).await?;
    assert_eq!(status, StatusCode::OK, "{}", sent);
    assert_eq!(sent["data"]["status"], "sent");
    assert!(sent["message"].is_string());
    {
        let mails = app.mailer.sent.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, vec!["buchhaltung@kunde.de".to_string()]);
        assert!(mails[0].subject.contains("RE-1"));
    }

    let (status, body) = app.put(&doc_uri, &token, invoice_body()).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    let (status, _) = app.delete(&doc_uri, &token).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.post(&format!("{}/status", doc_uri), &token, json!({ "status": "draft" })).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, paid) = app.post(&format!("{}/status", doc_uri), &token, json!({ "status": "paid" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["data"]["status"], "paid");
    assert!(paid["data"]["paid_at"].is_string());
    Ok(())
}

#[tokio::test]
async fn storno_cancels_an_issued_invoice() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let (_, created) = app
        .post(&format!("/api/companies/{}/documents/invoices", cid), &token, invoice_body())
        .await?;
    let id = created["data"]["id"].as_str().unwrap_or_default().to_string();
    let doc_uri = format!("/api/companies/{}/documents/invoices/{}", cid, id);

    let (status, _) = app.post(&format!("{}/storno", doc_uri), &token, json!({})).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    app.post(&format!("{}/status", doc_uri), &token, json!({ "status": "sent" })).await?;
    let (status, storno) = app
        .post(&format!("{}/storno", doc_uri), &token, json!({ "reason": "Falscher Betrag" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", storno);
    assert_eq!(storno["data"]["number"], "ST-1");
    assert_eq!(storno["data"]["status"], "storno");
    assert_eq!(storno["data"]["totals"]["gross"], "-238.00");
    assert_eq!(storno["data"]["original_document_id"], id.as_str());

    let (_, original) = app.get(&doc_uri, &token).await?;
    assert_eq!(original["data"]["status"], "cancelled");
    assert_eq!(original["data"]["storno_reason"], "Falscher Betrag");

    let (status, _) = app.post(&format!("{}/storno", doc_uri), &token, json!({})).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn stats_are_served_beside_ids() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let uri = format!("/api/companies/{}/documents/invoices", cid);
    let (_, paid) = app.post(&uri, &token, invoice_body()).await?;
    app.post(&uri, &token, invoice_body()).await?;
    let paid_uri = format!("{}/{}", uri, paid["data"]["id"].as_str().unwrap_or_default());
    for status in ["sent", "paid"] {
        app.post(&format!("{}/status", paid_uri), &token, json!({ "status": status })).await?;
    }

    let (status, stats) = app.get(&format!("{}/stats", uri), &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["total"], 2);
    assert_eq!(stats["data"]["by_status"]["draft"], 1);
    assert_eq!(stats["data"]["by_status"]["paid"], 1);
    assert_eq!(stats["data"]["total_revenue"], "238.00");
    assert_eq!(stats["data"]["pending_revenue"], "0.00");
    Ok(())
}

#[tokio::test]
async fn accepted_quotes_convert_into_invoices() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let (_, quote) = app
        .post(&format!("/api/companies/{}/documents/quotes", cid), &token, invoice_body())
        .await?;
    assert_eq!(quote["data"]["number"], "AN-1001");
    let quote_uri = format!("/api/companies/{}/documents/quotes/{}", cid, quote["data"]["id"].as_str().unwrap_or_default());

    let (status, _) = app.post(&format!("{}/convert", quote_uri), &token, json!({})).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    for status in ["sent", "accepted"] {
        let (code, _) = app.post(&format!("{}/status", quote_uri), &token, json!({ "status": status })).await?;
        assert_eq!(code, StatusCode::OK);
    }
    let (status, invoice) = app.post(&format!("{}/convert", quote_uri), &token, json!({})).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["data"]["kind"], "invoice");
    assert_eq!(invoice["data"]["number"], "RE-1");
    assert_eq!(invoice["data"]["status"], "draft");

    let (_, converted) = app.get(&quote_uri, &token).await?;
    assert_eq!(converted["data"]["status"], "converted");
    assert_eq!(converted["data"]["converted_invoice_id"], invoice["data"]["id"]);
    Ok(())
}

#[tokio::test]
async fn unknown_kinds_and_actions_are_not_found() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let (status, _) = app.get(&format!("/api/companies/{}/documents/receipts", cid), &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, quote) = app
        .post(&format!("/api/companies/{}/documents/quotes", cid), &token, invoice_body())
        .await?;
    let uri = format!(
        "/api/companies/{}/documents/quotes/{}/storno",
        cid,
        quote["data"]["id"].as_str().unwrap_or_default()
    );
    let (status, _) = app.post(&uri, &token, json!({})).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn sequences_can_be_listed_and_adjusted() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let (status, body) = app
        .put(
            &format!("/api/companies/{}/sequences/invoice", cid),
            &token,
            json!({ "format": "R-{number}", "next_number": 500 }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, created) = app
        .post(&format!("/api/companies/{}/documents/invoices", cid), &token, invoice_body())
        .await?;
    assert_eq!(created["data"]["number"], "R-500");

    let (status, list) = app.get(&format!("/api/companies/{}/sequences", cid), &token).await?;
    assert_eq!(status, StatusCode::OK);
    let invoice = list["data"]
        .as_array()
        .and_then(|all| all.iter().find(|s| s["type"] == "invoice"))
        .cloned()
        .unwrap_or_default();
    assert_eq!(invoice["next_number"], 501);
    assert_eq!(invoice["prefix"], "R-");

    let (status, _) = app
        .put(&format!("/api/companies/{}/sequences/invoice", cid), &token, json!({ "next_number": 10 }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn overflowing_line_items_are_rejected() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let uri = format!("/api/companies/{}/documents/invoices", cid);
    let body = json!({
        "customer_name": "Kunde AG",
        "items": [{ "description": "Beratung", "quantity": "79228162514264337593543950335", "unit_price": "2" }]
    });

    let (status, err) = app.post(&uri, &token, body).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", err);
    assert!(err["field_errors"]["items"].is_string());

    let (status, created) = app.post(&uri, &token, invoice_body()).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["number"], "RE-1");
    Ok(())
}

#[tokio::test]
async fn sequence_bounds_are_enforced() -> Result<()> {
    let (app, cid, token) = setup().await?;
    let uri = format!("/api/companies/{}/sequences/invoice", cid);

    let (status, err) = app.put(&uri, &token, json!({ "next_number": u64::MAX })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["field_errors"]["next_number"].is_string());

    let (status, err) = app.put(&uri, &token, json!({ "format": "RE-{number:2000000000}" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["field_errors"]["format"].is_string());

    let (status, _) = app.put(&uri, &token, json!({ "format": "RE-{number:6}" })).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, created) = app
        .post(&format!("/api/companies/{}/documents/invoices", cid), &token, invoice_body())
        .await?;
    assert_eq!(created["data"]["number"], "RE-000001");
    Ok(())
}
