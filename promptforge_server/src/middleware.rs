use axum::body::Body;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use promptforge_core::{Principal, Role, TokenVerifier};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::domains::auth::service::dev_bypass_principal;
use crate::domains::rate_limit::is_exempt_path;
use crate::state::AppState;

const TEST_MODE_HEADER: &str = "x-test-mode";

fn dev_bypass(state: &AppState, req: &Request<Body>) -> Option<Principal> {
  if !state.config.allow_test_mode_bypass {
    return None;
  }
  let header = req.headers().get(TEST_MODE_HEADER)?;
  if header.to_str().ok()? == "true" {
    Some(dev_bypass_principal())
  } else {
    None
  }
}

/// `AuthRequired` (§4.2): rejects with 401 if the dev-mode bypass does not
/// apply and the bearer token fails to validate.
pub async fn auth_required(
  State(state): State<AppState>,
  mut req: Request<Body>,
  next: Next,
) -> Response {
  if let Some(principal) = dev_bypass(&state, &req) {
    req.extensions_mut().insert(principal);
    return next.run(req).await;
  }

  let (mut parts, body) = req.into_parts();
  let bearer = match TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &state).await {
    Ok(header) => header.token().to_string(),
    Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
  };

  match state.verify_token(&bearer) {
    Ok(principal) => {
      let mut req = Request::from_parts(parts, body);
      req.extensions_mut().insert(principal);
      next.run(req).await
    }
    Err(err) => {
      warn!(error = ?err, "bearer token verification failed");
      StatusCode::UNAUTHORIZED.into_response()
    }
  }
}

/// `OptionalAuth` (§4.2): attaches a principal when the bearer validates,
/// otherwise proceeds anonymously rather than rejecting.
pub async fn auth_optional(
  State(state): State<AppState>,
  mut req: Request<Body>,
  next: Next,
) -> Response {
  if let Some(principal) = dev_bypass(&state, &req) {
    req.extensions_mut().insert(principal);
    return next.run(req).await;
  }

  let (mut parts, body) = req.into_parts();
  if let Ok(header) = TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &state).await {
    if let Ok(principal) = state.verify_token(header.token()) {
      let mut req = Request::from_parts(parts, body);
      req.extensions_mut().insert(principal);
      return next.run(req).await;
    }
  }

  let req = Request::from_parts(parts, body);
  next.run(req).await
}

/// §4.3's composed rate governor, applied before auth (per the request
/// path: `CORS → RequestID → RateGovernor → Auth`). Since the principal is
/// not yet validated at this point in the chain, the per-user scope keys
/// on the raw bearer token string rather than a verified user id — still
/// sufficient to bucket a single credential's traffic, while the actual
/// identity check remains the auth middleware's job downstream.
pub async fn rate_limit(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
  let path = req.uri().path().to_string();
  if is_exempt_path(&path) {
    return next.run(req).await;
  }

  let user_key = req
    .headers()
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .map(|s| s.to_string());

  let ip_key = req
    .headers()
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .unwrap_or("unknown")
    .trim()
    .to_string();

  let outcome = state
    .rate_governor
    .check_request(user_key.as_deref(), &ip_key, &path);

  if !outcome.allowed {
    metrics::counter!("rate_limit_rejected_total", "scope" => "composed").increment(1);
    let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
    let headers = response.headers_mut();
    headers.insert(
      "x-ratelimit-limit",
      HeaderValue::from_str(&outcome.limit.to_string()).unwrap(),
    );
    headers.insert(
      "x-ratelimit-remaining",
      HeaderValue::from_str(&outcome.remaining.to_string()).unwrap(),
    );
    headers.insert(
      "x-ratelimit-reset",
      HeaderValue::from_str(&outcome.reset_after.as_secs().to_string()).unwrap(),
    );
    return response;
  }

  next.run(req).await
}

/// A principal carrying at least one of `roles` may proceed; everyone else
/// gets 403 (`RoleRequired`, §4.2). Checked inline by handlers via
/// [`promptforge_core::Principal::has_role`] rather than as a standalone
/// layer, since no route on the current surface (§6) is role-gated beyond
/// ownership checks already enforced at the repository layer.
pub fn principal_has_any_role(principal: &Principal, roles: &[Role]) -> bool {
  roles.iter().any(|role| principal.has_role(*role))
}

/// CORS policy (§6): exact-match origin whitelist, credentials allowed,
/// 12h preflight cache. In development, `localhost`/`127.0.0.1`/`[::1]` on
/// any port are additionally allowed — gated by the environment flag, not
/// hardcoded into production builds.
pub fn cors_layer(allowed_origins: Vec<String>, is_dev: bool) -> CorsLayer {
  let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
    let Ok(origin_str) = origin.to_str() else {
      return false;
    };
    if allowed_origins.iter().any(|o| o == origin_str) {
      return true;
    }
    if is_dev {
      return origin_str.contains("localhost")
        || origin_str.contains("127.0.0.1")
        || origin_str.contains("[::1]");
    }
    false
  });

  CorsLayer::new()
    .allow_origin(allow_origin)
    .allow_credentials(true)
    .allow_methods([
      axum::http::Method::GET,
      axum::http::Method::POST,
      axum::http::Method::PUT,
      axum::http::Method::PATCH,
      axum::http::Method::DELETE,
      axum::http::Method::OPTIONS,
      axum::http::Method::HEAD,
    ])
    .allow_headers([
      axum::http::header::AUTHORIZATION,
      axum::http::header::CONTENT_TYPE,
      HeaderName::from_static("x-session-id"),
      HeaderName::from_static("x-request-id"),
      HeaderName::from_static("x-csrf-token"),
    ])
    .expose_headers([
      HeaderName::from_static("x-request-id"),
      HeaderName::from_static("x-session-id"),
      HeaderName::from_static("x-ratelimit-limit"),
      HeaderName::from_static("x-ratelimit-remaining"),
      HeaderName::from_static("x-ratelimit-reset"),
    ])
    .max_age(std::time::Duration::from_secs(12 * 60 * 60))
}
