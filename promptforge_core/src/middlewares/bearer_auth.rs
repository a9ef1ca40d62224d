use axum::{
  body::Body,
  extract::{FromRequestParts, Request, State},
  http::StatusCode,
  middleware::Next,
  response::{IntoResponse, Response},
};

use axum_extra::{
  TypedHeader,
  headers::{Authorization, authorization::Bearer},
};
use tracing::warn;

use super::TokenVerifier;

/// `T` is any application state implementing [`TokenVerifier`]. Wrap with
/// `axum::middleware::from_fn_with_state`. On success the verified claims
/// (converted into `U`) are inserted as a request extension, readable by
/// handlers via `Extension<U>` or a small `RequestContext` extractor —
/// this is the "Principal extension" from the glossary.
pub async fn verify_token_middleware<T, U>(
  State(state): State<T>,
  req: Request<Body>,
  next: Next,
) -> Response
where
  T: TokenVerifier + Clone + Send + Sync + 'static,
  U: From<T::Claims> + Clone + Send + Sync + 'static,
{
  let (mut parts, body) = req.into_parts();
  let token =
    match TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &state).await {
      Ok(bearer) => bearer.token().to_string(),
      Err(e) => {
        warn!("bearer token missing or malformed: {e}");
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
      }
    };

  match state.verify_token(&token) {
    Ok(claims) => {
      let principal: U = claims.into();
      let mut req = Request::from_parts(parts, body);
      req.extensions_mut().insert(principal);
      next.run(req).await
    }
    Err(e) => {
      warn!("bearer token verification failed: {e:?}");
      (StatusCode::UNAUTHORIZED, "invalid or expired token").into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::jwt::{Principal, Role, TokenManager};
  use crate::{CoreError, ids::UserId};
  use axum::{Router, body::Body, middleware::from_fn_with_state, routing::get};
  use std::sync::Arc;
  use tower::ServiceExt;

  #[derive(Clone)]
  struct TestState {
    inner: Arc<TokenManager>,
  }

  impl TokenVerifier for TestState {
    type Claims = Principal;
    type Error = CoreError;

    fn verify_token(&self, token: &str) -> Result<Principal, CoreError> {
      self.inner.verify_access_token(token)
    }
  }

  async fn handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
  }

  #[tokio::test]
  async fn rejects_missing_header() {
    let state = TestState {
      inner: Arc::new(TokenManager::new("test-secret-padding-padding")),
    };
    let app = Router::new().route("/api", get(handler)).layer(
      from_fn_with_state(state, verify_token_middleware::<TestState, Principal>),
    );

    let req = Request::builder().uri("/api").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn accepts_valid_bearer_token() {
    let tm = TokenManager::new("test-secret-padding-padding");
    let user_id = UserId::new();
    let (token, _) = tm
      .generate_access_token(user_id, vec![Role::User], vec![], false)
      .unwrap();
    let state = TestState {
      inner: Arc::new(tm),
    };

    let app = Router::new().route("/api", get(handler)).layer(
      from_fn_with_state(state, verify_token_middleware::<TestState, Principal>),
    );

    let req = Request::builder()
      .uri("/api")
      .header("Authorization", format!("Bearer {token}"))
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
