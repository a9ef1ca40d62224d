use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promptforge_core::{CoreError, PromptId, UserId};
use serde_json::Value;
use sqlx::PgPool;

use crate::models::{Complexity, PromptHistoryRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
  CreatedAt,
  UpdatedAt,
  Rating,
}

impl SortBy {
  fn column(self) -> &'static str {
    match self {
      SortBy::CreatedAt => "created_at",
      SortBy::UpdatedAt => "updated_at",
      SortBy::Rating => "rating",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
  Asc,
  Desc,
}

impl SortDir {
  fn sql(self) -> &'static str {
    match self {
      SortDir::Asc => "ASC",
      SortDir::Desc => "DESC",
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
  pub page: i64,
  pub limit: i64,
  pub search: Option<String>,
  pub technique: Option<String>,
  pub date_from: Option<DateTime<Utc>>,
  pub date_to: Option<DateTime<Utc>>,
  pub sort_by: Option<SortBy>,
  pub dir: Option<SortDir>,
}

pub struct ListResult {
  pub items: Vec<PromptHistoryRow>,
  pub page: i64,
  pub limit: i64,
  pub total_records: i64,
  pub total_pages: i64,
  pub has_next: bool,
  pub has_previous: bool,
}

/// Mockable seam over the `prompt_history` table (§11.4): the orchestration
/// engine's history persistence depends on this instead of the concrete
/// `PgHistoryRepository`, so unit tests can substitute `MockHistoryRepository`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRepository: Send + Sync {
  #[allow(clippy::too_many_arguments)]
  async fn append(
    &self,
    owner_id: UserId,
    original_prompt: &str,
    enhanced_prompt: &str,
    intent: &str,
    complexity: Complexity,
    techniques: &[String],
    metadata: Value,
  ) -> Result<PromptHistoryRow, CoreError>;

  async fn list(&self, owner_id: UserId, query: &ListQuery) -> Result<ListResult, CoreError>;

  async fn get_by_id_for_owner(
    &self,
    owner_id: UserId,
    id: PromptId,
  ) -> Result<Option<PromptHistoryRow>, CoreError>;
}

#[derive(Clone)]
pub struct PgHistoryRepository {
  pool: PgPool,
}

impl PgHistoryRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[allow(clippy::too_many_arguments)]
  pub async fn append(
    &self,
    owner_id: UserId,
    original_prompt: &str,
    enhanced_prompt: &str,
    intent: &str,
    complexity: Complexity,
    techniques: &[String],
    metadata: Value,
  ) -> Result<PromptHistoryRow, CoreError> {
    sqlx::query_as::<_, PromptHistoryRow>(
      r#"
      INSERT INTO prompt_history
        (id, owner_id, original_prompt, enhanced_prompt, intent, complexity, techniques, metadata)
      VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7)
      RETURNING *
      "#,
    )
    .bind(owner_id.into_uuid())
    .bind(original_prompt)
    .bind(enhanced_prompt)
    .bind(intent)
    .bind(complexity)
    .bind(techniques)
    .bind(metadata)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))
  }

  /// §4.6 `List`. Every predicate is parameter-bound — filters are never
  /// concatenated into the query string.
  pub async fn list(&self, owner_id: UserId, query: &ListQuery) -> Result<ListResult, CoreError> {
    let limit = query.limit.clamp(1, 100);
    let page = query.page.max(1);
    let offset = (page - 1) * limit;
    let sort_column = query.sort_by.unwrap_or(SortBy::CreatedAt).column();
    let sort_dir = query.dir.unwrap_or(SortDir::Desc).sql();

    let total_records: i64 = sqlx::query_scalar(&format!(
      r#"
      SELECT count(*) FROM prompt_history
      WHERE owner_id = $1
        AND ($2::text IS NULL OR search_vector @@ plainto_tsquery('english', $2))
        AND ($3::text IS NULL OR techniques @> ARRAY[$3::text])
        AND ($4::timestamptz IS NULL OR created_at >= $4)
        AND ($5::timestamptz IS NULL OR created_at <= $5)
      "#
    ))
    .bind(owner_id.into_uuid())
    .bind(&query.search)
    .bind(&query.technique)
    .bind(query.date_from)
    .bind(query.date_to)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))?;

    // `sort_column`/`sort_dir` are drawn from a fixed enum, never from raw
    // user input, so interpolating them here cannot introduce injection.
    let sql = format!(
      r#"
      SELECT * FROM prompt_history
      WHERE owner_id = $1
        AND ($2::text IS NULL OR search_vector @@ plainto_tsquery('english', $2))
        AND ($3::text IS NULL OR techniques @> ARRAY[$3::text])
        AND ($4::timestamptz IS NULL OR created_at >= $4)
        AND ($5::timestamptz IS NULL OR created_at <= $5)
      ORDER BY {sort_column} {sort_dir}
      LIMIT $6 OFFSET $7
      "#
    );

    let items = sqlx::query_as::<_, PromptHistoryRow>(&sql)
      .bind(owner_id.into_uuid())
      .bind(&query.search)
      .bind(&query.technique)
      .bind(query.date_from)
      .bind(query.date_to)
      .bind(limit)
      .bind(offset)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| CoreError::database(e.to_string()))?;

    let total_pages = (total_records + limit - 1) / limit.max(1);

    Ok(ListResult {
      items,
      page,
      limit,
      total_records,
      total_pages: total_pages.max(1),
      has_next: page < total_pages,
      has_previous: page > 1,
    })
  }

  /// §4.6 `GetById`: ownership is enforced by binding `owner_id` into the
  /// query itself rather than checking it after the fact, so a record
  /// belonging to another owner is indistinguishable from one that does
  /// not exist — both come back as `None`, which callers map to the same
  /// `NotFound`/`Forbidden`-conflated response.
  pub async fn get_by_id_for_owner(
    &self,
    owner_id: UserId,
    id: PromptId,
  ) -> Result<Option<PromptHistoryRow>, CoreError> {
    sqlx::query_as::<_, PromptHistoryRow>(
      "SELECT * FROM prompt_history WHERE id = $1 AND owner_id = $2",
    )
    .bind(id.into_uuid())
    .bind(owner_id.into_uuid())
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))
  }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
  async fn append(
    &self,
    owner_id: UserId,
    original_prompt: &str,
    enhanced_prompt: &str,
    intent: &str,
    complexity: Complexity,
    techniques: &[String],
    metadata: Value,
  ) -> Result<PromptHistoryRow, CoreError> {
    PgHistoryRepository::append(
      self,
      owner_id,
      original_prompt,
      enhanced_prompt,
      intent,
      complexity,
      techniques,
      metadata,
    )
    .await
  }

  async fn list(&self, owner_id: UserId, query: &ListQuery) -> Result<ListResult, CoreError> {
    PgHistoryRepository::list(self, owner_id, query).await
  }

  async fn get_by_id_for_owner(
    &self,
    owner_id: UserId,
    id: PromptId,
  ) -> Result<Option<PromptHistoryRow>, CoreError> {
    PgHistoryRepository::get_by_id_for_owner(self, owner_id, id).await
  }
}
