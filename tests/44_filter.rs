mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

async fn seeded() -> Result<(common::TestApp, String, String)> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let token = app.user_token("owner-1");
    for (name, city, budget) in [("Alpha", "Berlin", 100), ("Beta", "Hamburg", 250), ("Gamma", "Berlin", 400)] {
        let (status, body) = app
            .post(
                &format!("/api/companies/{}/data/projects", cid),
                &token,
                json!({ "name": name, "city": city, "budget": budget }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "seed failed: {}", body);
    }
    Ok((app, cid, token))
}

fn names(body: &serde_json::Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["name"].as_str().map(String::from)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn find_filters_and_orders() -> Result<()> {
    let (app, cid, token) = seeded().await?;
    let uri = format!("/api/companies/{}/find/projects", cid);

    let (status, body) = app
        .post(&uri, &token, json!({ "where": { "city": "Berlin" }, "order": "name desc" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(names(&body), vec!["Gamma", "Alpha"]);

    let (_, body) = app
        .post(&uri, &token, json!({ "where": { "budget": { "$gte": 250 } }, "order": "budget asc" }))
        .await?;
    assert_eq!(names(&body), vec!["Beta", "Gamma"]);

    let (_, body) = app
        .post(&uri, &token, json!({ "where": { "name": { "$in": ["Alpha", "Beta"] } }, "order": "name", "limit": 1, "offset": 1 }))
        .await?;
    assert_eq!(names(&body), vec!["Beta"]);
    Ok(())
}

#[tokio::test]
async fn invalid_filters_are_rejected() -> Result<()> {
    let (app, cid, token) = seeded().await?;
    let (status, body) = app
        .post(
            &format!("/api/companies/{}/find/projects", cid),
            &token,
            json!({ "where": { "budget": { "$bogus": 1 } } }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["filter"].is_string(), "{}", body);
    assert!(!body.to_string().contains("$bogus"), "{}", body);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_get_the_catalog_message() -> Result<()> {
    let (app, cid, token) = seeded().await?;
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/companies/{}/find/projects", cid))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"where\": oops"))?;
    let (status, body) = app.dispatch(request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    assert_eq!(body["error"], taskilo_api::messages::Msg::InvalidJson.text());
    Ok(())
}
