mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let app = common::TestApp::new();
    let (status, body) = app.send(Method::GET, "/", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Taskilo API");
    Ok(())
}

#[tokio::test]
async fn health_reports_the_store_backend() -> Result<()> {
    let app = common::TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["store"], "memory");
    Ok(())
}
