mod bearer_auth;
mod request_id;

use axum::{Router, middleware::from_fn};
use tower::ServiceBuilder;
use tower_http::{
  LatencyUnit,
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub use self::bearer_auth::verify_token_middleware;
pub use self::request_id::{REQUEST_ID_HEADER, request_id_middleware};

/// Generic over whatever a downstream crate's app state uses to check a
/// bearer token — `promptforge_server::state::AppState` implements this via
/// its `TokenManager`.
pub trait TokenVerifier {
  type Claims;
  type Error: std::fmt::Debug;

  fn verify_token(&self, token: &str) -> Result<Self::Claims, Self::Error>;
}

/// Applies the ambient layers every route gets regardless of auth
/// requirements: tracing spans and request-id propagation (§14, layers 2
/// and 4 — CORS and the rate governor are applied by the server crate,
/// which owns their configuration).
pub trait SetLayer {
  fn set_layer(self) -> Self;
}

impl<S> SetLayer for Router<S>
where
  S: Clone + Send + Sync + 'static,
{
  fn set_layer(self) -> Self {
    self.layer(
      ServiceBuilder::new()
        .layer(
          TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().include_headers(true))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
              DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Micros),
            ),
        )
        .layer(from_fn(request_id_middleware)),
    )
  }
}
