pub mod config;
pub mod domains;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod state;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use promptforge_core::SetLayer;
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use openapi::ApiDoc;
use state::AppState;

/// Assembles the full router (§6, §14's layering order), outermost first:
/// panic recovery, tracing + request id (bundled as one unit by
/// `SetLayer`, tracing outermost of the pair), CORS, the rate governor,
/// then route-scoped auth. Panic recovery wraps everything else, including
/// the tracing span machinery, so a handler panic never tears down the
/// process.
pub fn build_router(state: AppState) -> Router {
  let public_routes = Router::new()
    .route("/health", get(handlers::health::health))
    .route("/health/live", get(handlers::health::live))
    .route("/health/ready", get(handlers::health::ready))
    .route("/metrics", get(handlers::metrics::metrics))
    .route("/api/v1/techniques", get(handlers::techniques::list_techniques))
    .route("/api/v1/auth/register", post(handlers::auth::register))
    .route("/api/v1/auth/login", post(handlers::auth::login))
    .route("/api/v1/auth/refresh", post(handlers::auth::refresh));

  let optional_auth_routes = Router::new()
    .route("/api/v1/enhance", post(handlers::enhance::enhance))
    .route("/api/v1/analyze", post(handlers::enhance::analyze))
    .layer(from_fn_with_state(state.clone(), middleware::auth_optional));

  let required_auth_routes = Router::new()
    .route("/api/v1/enhance/batch", post(handlers::enhance::enhance_batch))
    .route("/api/v1/auth/logout", post(handlers::auth::logout))
    .route(
      "/api/v1/auth/profile",
      get(handlers::auth::get_profile).put(handlers::auth::update_profile),
    )
    .route(
      "/api/v1/auth/change-password",
      post(handlers::auth::change_password),
    )
    .route("/api/v1/prompts/history", get(handlers::history::list_history))
    .route("/api/v1/prompts/{id}", get(handlers::history::get_history_item))
    .route(
      "/api/v1/prompts/{id}/rerun",
      post(handlers::history::rerun_history_item),
    )
    .layer(from_fn_with_state(state.clone(), middleware::auth_required));

  let docs = if state.config.enable_docs {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
  } else {
    Router::new()
  };

  Router::new()
    .merge(public_routes)
    .merge(optional_auth_routes)
    .merge(required_auth_routes)
    .merge(docs)
    .layer(from_fn_with_state(state.clone(), middleware::rate_limit))
    .set_layer()
    .layer(middleware::cors_layer(
      state.config.cors_allowed_origins.clone(),
      state.config.environment != "production",
    ))
    .layer(CatchPanicLayer::new())
    .with_state(state)
}
