use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use promptforge_core::{Principal, PromptId};

use crate::domains::cache::{fingerprint_hex, history_list_key, ttl};
use crate::domains::history::repository::{ListQuery, SortBy, SortDir};
use crate::domains::orchestration;
use crate::dtos::{HistoryListParams, HistoryListResponse};
use crate::error::AppError;
use crate::models::PromptHistoryRow;
use crate::state::AppState;

fn parse_sort_by(value: Option<&str>) -> Option<SortBy> {
  match value?.to_ascii_lowercase().as_str() {
    "created_at" => Some(SortBy::CreatedAt),
    "updated_at" => Some(SortBy::UpdatedAt),
    "rating" => Some(SortBy::Rating),
    _ => None,
  }
}

fn parse_sort_dir(value: Option<&str>) -> Option<SortDir> {
  match value?.to_ascii_lowercase().as_str() {
    "asc" => Some(SortDir::Asc),
    "desc" => Some(SortDir::Desc),
    _ => None,
  }
}

/// §4.6 `List`: paginated, searchable, owner-scoped.
#[utoipa::path(
  get,
  path = "/api/v1/prompts/history",
  security(("access_token" = [])),
  responses((status = 200, description = "Paginated, owner-scoped list", body = crate::dtos::HistoryListResponse)),
  tag = "history"
)]
pub async fn list_history(
  State(state): State<AppState>,
  Extension(principal): Extension<Principal>,
  Query(params): Query<HistoryListParams>,
) -> Result<Json<crate::dtos::HistoryListResponse>, AppError> {
  let query = ListQuery {
    page: params.page.unwrap_or(1),
    limit: params.limit.unwrap_or(20),
    search: params.search,
    technique: params.technique,
    date_from: params.date_from,
    date_to: params.date_to,
    sort_by: parse_sort_by(params.sort_by.as_deref()),
    dir: parse_sort_dir(params.dir.as_deref()),
  };

  let owner_id = principal.user_id.to_string();
  let query_hash = fingerprint_hex(&format!("{:?}", query), &[], None, None);
  let cache_key = history_list_key(&owner_id, &query_hash);

  if let Some(cached) = state.cache.get::<HistoryListResponse>(&cache_key).await {
    return Ok(Json(cached));
  }

  let result = state.history.list(principal.user_id, &query).await?;

  let response = HistoryListResponse {
    items: result.items,
    page: result.page,
    limit: result.limit,
    total_records: result.total_records,
    total_pages: result.total_pages,
    has_next: result.has_next,
    has_previous: result.has_previous,
  };
  state
    .cache
    .set(&cache_key, &response, ttl::HISTORY_LIST_SECS)
    .await;

  Ok(Json(response))
}

/// §4.6 `GetById`: owner-scoped. A record belonging to another user is
/// indistinguishable from a missing one — both return 404.
#[utoipa::path(
  get,
  path = "/api/v1/prompts/{id}",
  security(("access_token" = [])),
  responses(
    (status = 200, description = "A single history record", body = PromptHistoryRow),
    (status = 404, description = "Not found or not owned by the caller"),
  ),
  tag = "history"
)]
pub async fn get_history_item(
  State(state): State<AppState>,
  Extension(principal): Extension<Principal>,
  Path(id): Path<PromptId>,
) -> Result<Json<PromptHistoryRow>, AppError> {
  let item = state
    .history
    .get_by_id_for_owner(principal.user_id, id)
    .await?
    .ok_or(AppError::NotFound)?;

  Ok(Json(item))
}

/// §4.6 `Rerun`: re-executes the pipeline from the stored original text,
/// producing a fresh history record tagged with `rerun_from`.
#[utoipa::path(
  post,
  path = "/api/v1/prompts/{id}/rerun",
  security(("access_token" = [])),
  responses(
    (status = 200, description = "New record via the pipeline", body = orchestration::EnhanceOutcome),
    (status = 404, description = "Not found or not owned by the caller"),
  ),
  tag = "history"
)]
pub async fn rerun_history_item(
  State(state): State<AppState>,
  Extension(principal): Extension<Principal>,
  Path(id): Path<PromptId>,
) -> Result<Json<orchestration::EnhanceOutcome>, AppError> {
  let item = state
    .history
    .get_by_id_for_owner(principal.user_id, id)
    .await?
    .ok_or(AppError::NotFound)?;

  let outcome = orchestration::rerun(
    &state,
    principal.user_id,
    item.original_prompt,
    id.to_string(),
  )
  .await?;

  Ok(Json(outcome))
}
