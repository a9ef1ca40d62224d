//! Integration test driving the router end-to-end against a throwaway
//! Postgres database (§11.4). Gated behind `test-util`, skipped by default —
//! run with `cargo test --features test-util --test auth_flow`.
#![cfg(feature = "test-util")]

use http_body_util::BodyExt;
use promptforge_server::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(
  app: axum::Router,
  method: &str,
  uri: &str,
  body: Value,
) -> (axum::http::StatusCode, Value) {
  let request = axum::http::Request::builder()
    .method(method)
    .uri(uri)
    .header("content-type", "application/json")
    .body(axum::body::Body::from(body.to_string()))
    .unwrap();

  let response = app.oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = response.into_body().collect().await.unwrap().to_bytes();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, json)
}

#[tokio::test]
async fn register_then_login_round_trips_tokens() {
  let (_tdb, state) = AppState::test_new().await.expect("test database");
  let app = promptforge_server::build_router(state);

  let (status, body) = send(
    app.clone(),
    "POST",
    "/api/v1/auth/register",
    json!({
      "email": "integration@example.com",
      "username": "integration_user",
      "password": "Str0ngPassw0rd",
      "confirm_password": "Str0ngPassw0rd",
    }),
  )
  .await;

  assert_eq!(status, axum::http::StatusCode::CREATED);
  assert!(body["access_token"].is_string());

  let (status, body) = send(
    app,
    "POST",
    "/api/v1/auth/login",
    json!({
      "email_or_username": "integration_user",
      "password": "Str0ngPassw0rd",
    }),
  )
  .await;

  assert_eq!(status, axum::http::StatusCode::OK);
  assert!(body["access_token"].is_string());
  assert!(body["refresh_token"].is_string());
}

#[tokio::test]
async fn login_with_wrong_password_returns_unauthorized() {
  let (_tdb, state) = AppState::test_new().await.expect("test database");
  let app = promptforge_server::build_router(state);

  send(
    app.clone(),
    "POST",
    "/api/v1/auth/register",
    json!({
      "email": "wrongpass@example.com",
      "username": "wrongpass_user",
      "password": "Str0ngPassw0rd",
      "confirm_password": "Str0ngPassw0rd",
    }),
  )
  .await;

  let (status, _) = send(
    app,
    "POST",
    "/api/v1/auth/login",
    json!({
      "email_or_username": "wrongpass_user",
      "password": "TotallyWrong1",
    }),
  )
  .await;

  assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);
}
