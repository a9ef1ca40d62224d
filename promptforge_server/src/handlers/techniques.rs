use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domains::cache::{technique_catalog_key, ttl};
use crate::domains::orchestration::techniques::{catalog, TechniqueDescriptor};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TechniqueCatalogResponse {
  pub techniques: Vec<TechniqueDescriptor>,
}

/// `GET /api/v1/techniques`: the static catalog, cached under a well-known
/// key since it never changes within a deployment (§4.1's technique-catalog
/// TTL entry).
#[utoipa::path(
  get,
  path = "/api/v1/techniques",
  responses((status = 200, description = "Static technique catalog", body = TechniqueCatalogResponse)),
  tag = "techniques"
)]
pub async fn list_techniques(State(state): State<AppState>) -> Json<TechniqueCatalogResponse> {
  let key = technique_catalog_key();

  if let Some(cached) = state.cache.get::<TechniqueCatalogResponse>(key).await {
    return Json(cached);
  }

  let response = TechniqueCatalogResponse {
    techniques: catalog(),
  };
  state
    .cache
    .set(key, &response, ttl::TECHNIQUE_CATALOG_SECS)
    .await;

  Json(response)
}
