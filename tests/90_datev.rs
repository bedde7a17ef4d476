mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use taskilo_api::database::DocumentStore;

#[tokio::test]
async fn authorize_then_callback_connects_the_company() -> Result<()> {
    let app = common::TestApp::new();
    let cid = app.create_company("owner-1", "Muster GmbH").await?;
    let token = app.user_token("owner-1");

    let (status, body) = app
        .get(&format!("/api/companies/{}/integrations/datev/authorize", cid), &token)
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let url = url::Url::parse(body["data"]["url"].as_str().unwrap_or_default())?;
    let params: std::collections::HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(params.get("client_id").map(String::as_str), Some("taskilo-test"));
    assert_eq!(params.get("code_challenge_method").map(String::as_str), Some("S256"));
    let state = body["data"]["state"].as_str().unwrap_or_default().to_string();
    assert_eq!(params.get("state"), Some(&state));

    let callback = format!("/oauth/datev/callback?code=abc&state={}", state);
    let (status, body) = app.send(Method::GET, &callback, None, None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["connected"], true);
    assert_eq!(body["data"]["company_id"], cid.as_str());

    let tokens = app
        .store
        .get(&format!("companies/{}/integrations", cid), "datev")
        .await?
        .map(|doc| doc.to_json())
        .unwrap_or_default();
    assert_eq!(tokens["access_token"], "access-abc");

    // The state is single use.
    let (status, _) = app.send(Method::GET, &callback, None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, company) = app.get(&format!("/api/companies/{}", cid), &token).await?;
    assert_eq!(company["data"]["integrations"]["datev_connected"], true);

    let (status, body) = app
        .delete(&format!("/api/companies/{}/integrations/datev", cid), &token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], false);
    Ok(())
}

#[tokio::test]
async fn unknown_state_is_rejected() -> Result<()> {
    let app = common::TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/oauth/datev/callback?code=abc&state=forged", None, None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = app.send(Method::GET, "/oauth/datev/callback", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
