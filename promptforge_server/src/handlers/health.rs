use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
  pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadinessBody {
  pub status: &'static str,
  pub database: &'static str,
  pub cache: &'static str,
}

/// `GET /health`: unconditional liveness, used by load balancers that only
/// care whether the process is scheduled and answering at all.
pub async fn health() -> Json<HealthBody> {
  Json(HealthBody { status: "ok" })
}

/// `GET /health/live`: identical contract to `/health` (§6) — kept as a
/// distinct route so an orchestrator's liveness probe can be configured
/// independently of the plain health check.
pub async fn live() -> Json<HealthBody> {
  Json(HealthBody { status: "ok" })
}

/// `GET /health/ready`: checks the database pool and cache connection can
/// actually be reached, returning 503 if either is down.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessBody>) {
  let database_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

  let cache_ok = match state.cache.ping().await {
    Ok(()) => true,
    Err(err) => {
      tracing::warn!(error = ?err, "readiness check: cache unreachable");
      false
    }
  };

  let status = if database_ok && cache_ok {
    StatusCode::OK
  } else {
    StatusCode::SERVICE_UNAVAILABLE
  };

  (
    status,
    Json(ReadinessBody {
      status: if status == StatusCode::OK { "ok" } else { "degraded" },
      database: if database_ok { "up" } else { "down" },
      cache: if cache_ok { "up" } else { "down" },
    }),
  )
}
