mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

fn statuses(body: &Value) -> Vec<(String, String)> {
    body["data"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|r| {
                    (
                        r["id"].as_str().unwrap_or_default().to_string(),
                        r["booking_status"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn transactions_link_to_invoices() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let token = app.user_token("owner-1");
    let tx_uri = format!("/api/companies/{}/transactions", cid);

    let (status, body) = app
        .post(
            &tx_uri,
            &token,
            json!([
                { "id": "tx-1", "amount": "238.00", "booking_date": "2024-05-02", "counterparty_name": "Kunde AG" },
                { "id": "tx-2", "amount": "-49.90", "booking_date": "2024-05-03", "purpose": "Software" }
            ]),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["imported"], 2);

    // Re-importing the same provider ids updates in place.
    app.post(&tx_uri, &token, json!([{ "id": "tx-1", "amount": "238.00", "booking_date": "2024-05-02" }]))
        .await?;
    let (_, list) = app.get(&tx_uri, &token).await?;
    assert_eq!(
        statuses(&list),
        vec![("tx-2".to_string(), "open".to_string()), ("tx-1".to_string(), "open".to_string())]
    );

    let (_, invoice) = app
        .post(
            &format!("/api/companies/{}/documents/invoices", cid),
            &token,
            json!({ "customer_name": "Kunde AG", "items": [{ "description": "Beratung", "quantity": "2", "unit_price": "100" }] }),
        )
        .await?;
    let invoice_id = invoice["data"]["id"].as_str().unwrap_or_default().to_string();
    let link_uri = format!("{}/tx-1/links", tx_uri);
    let link_body = json!({ "document_kind": "invoice", "document_id": invoice_id });

    let (status, link) = app.post(&link_uri, &token, link_body.clone()).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", link);
    assert_eq!(link["data"]["document_number"], "RE-1");
    assert_eq!(link["data"]["document_gross"], "238.00");

    let (status, _) = app.post(&link_uri, &token, link_body).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, booked) = app.get(&format!("{}?view=booked", tx_uri), &token).await?;
    assert_eq!(statuses(&booked), vec![("tx-1".to_string(), "booked".to_string())]);

    let (status, links) = app
        .get(&format!("/api/companies/{}/documents/invoices/{}/links", cid, invoice_id), &token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(links["data"][0]["transaction_id"], "tx-1");

    let (status, _) = app.delete(&format!("{}/{}", link_uri, invoice_id), &token).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("{}/{}", link_uri, invoice_id), &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, open) = app.get(&format!("{}?view=open", tx_uri), &token).await?;
    assert_eq!(statuses(&open).len(), 2);
    Ok(())
}

#[tokio::test]
async fn linking_needs_both_sides() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let token = app.user_token("owner-1");

    let (status, _) = app
        .post(
            &format!("/api/companies/{}/transactions/missing/links", cid),
            &token,
            json!({ "document_kind": "invoice", "document_id": "nope" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            &format!("/api/companies/{}/transactions", cid),
            &token,
            json!([{ "id": " ", "amount": "1", "booking_date": "2024-05-02" }]),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
