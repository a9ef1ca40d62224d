use axum::extract::State;
use axum::{Extension, Json};
use futures::stream::{self, StreamExt};
use promptforge_core::Principal;

use crate::domains::orchestration::{self, EnhanceOutcome, EnhanceRequest};
use crate::dtos::{
  AnalyzeRequest, AnalyzeResponse, BatchEnhanceItemResult, BatchEnhanceRequest,
  BatchEnhanceResponse,
};
use crate::error::AppError;
use crate::state::AppState;

/// Batch mode runs at most this many enhancements concurrently (§4.5).
const BATCH_CONCURRENCY: usize = 5;
/// Batch mode accepts at most this many items per request (§4.5).
const BATCH_MAX_ITEMS: usize = 50;

#[utoipa::path(
  post,
  path = "/api/v1/enhance",
  request_body = EnhanceRequest,
  responses(
    (status = 200, description = "Enhanced prompt", body = EnhanceOutcome),
    (status = 502, description = "Generation failed or a collaborator is unavailable"),
    (status = 504, description = "Orchestration deadline exceeded"),
  ),
  tag = "enhance"
)]
pub async fn enhance(
  State(state): State<AppState>,
  principal: Option<Extension<Principal>>,
  Json(payload): Json<EnhanceRequest>,
) -> Result<Json<EnhanceOutcome>, AppError> {
  let owner_id = principal.map(|Extension(p)| p.user_id);
  let outcome = orchestration::enhance(&state, owner_id, payload).await?;
  Ok(Json(outcome))
}

/// §4.5's batch mode: N ≤ 50 items, at most 5 concurrent enhancements,
/// single-item failure never cancels its siblings — every item resolves to
/// its own `success`/`result`/`error` triple, returned in input order.
#[utoipa::path(
  post,
  path = "/api/v1/enhance/batch",
  security(("access_token" = [])),
  request_body = BatchEnhanceRequest,
  responses(
    (status = 200, description = "Per-item result/error pairs in input order", body = BatchEnhanceResponse),
    (status = 400, description = "Empty batch or more than 50 items"),
  ),
  tag = "enhance"
)]
pub async fn enhance_batch(
  State(state): State<AppState>,
  Extension(principal): Extension<Principal>,
  Json(payload): Json<BatchEnhanceRequest>,
) -> Result<Json<BatchEnhanceResponse>, AppError> {
  if payload.items.is_empty() {
    return Err(AppError::InvalidInput("items must not be empty".into()));
  }
  if payload.items.len() > BATCH_MAX_ITEMS {
    return Err(AppError::InvalidInput(format!(
      "batch accepts at most {BATCH_MAX_ITEMS} items"
    )));
  }

  let owner_id = principal.user_id;
  let state = &state;

  let mut items: Vec<BatchEnhanceItemResult> = stream::iter(payload.items.into_iter().enumerate())
    .map(|(index, item)| {
      let state = state.clone();
      async move {
        match orchestration::enhance(&state, Some(owner_id), item).await {
          Ok(outcome) => BatchEnhanceItemResult {
            index,
            success: true,
            result: Some(outcome),
            error: None,
          },
          Err(err) => BatchEnhanceItemResult {
            index,
            success: false,
            result: None,
            error: Some(AppError::from(err).to_string()),
          },
        }
      }
    })
    .buffer_unordered(BATCH_CONCURRENCY)
    .collect()
    .await;

  items.sort_by_key(|item| item.index);

  Ok(Json(BatchEnhanceResponse { items }))
}

#[utoipa::path(
  post,
  path = "/api/v1/analyze",
  request_body = AnalyzeRequest,
  responses((status = 200, description = "Classification only", body = AnalyzeResponse)),
  tag = "enhance"
)]
pub async fn analyze(
  State(state): State<AppState>,
  Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
  let normalized_text = crate::domains::cache::normalize_text(&payload.text);
  let classification = state.classifier.classify(&normalized_text).await?;
  let complexity = crate::domains::orchestration::complexity::normalize(&classification.complexity);

  Ok(Json(AnalyzeResponse {
    intent: classification.intent,
    complexity: complexity.to_string(),
    confidence: classification.confidence,
    suggested_techniques: classification.suggested_techniques,
  }))
}
