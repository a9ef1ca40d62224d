use promptforge_core::UserId;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Append-only audit sink (§12/§13): one row per completed `/enhance`
/// request plus one row per account-lockout transition. Never read back
/// on the request path — a write failure here is logged and swallowed,
/// not surfaced to the caller.
#[derive(Clone)]
pub struct PgApiUsageRepository {
  pool: PgPool,
}

impl PgApiUsageRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn insert(
    &self,
    user_id: Option<UserId>,
    endpoint: &str,
    event: &str,
    status_code: Option<i32>,
    latency_ms: Option<i64>,
    metadata: Value,
  ) -> Result<(), sqlx::Error> {
    sqlx::query(
      "INSERT INTO api_usage (id, user_id, endpoint, event, status_code, latency_ms, metadata, created_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, now())",
    )
    .bind(Uuid::new_v4())
    .bind(user_id.map(UserId::into_uuid))
    .bind(endpoint)
    .bind(event)
    .bind(status_code)
    .bind(latency_ms)
    .bind(metadata)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  /// §12: one row per completed `/enhance` request.
  pub async fn record_enhance_completion(
    &self,
    user_id: Option<UserId>,
    latency_ms: i64,
    cache: Option<&str>,
  ) -> Result<(), sqlx::Error> {
    self
      .insert(
        user_id,
        "/api/v1/enhance",
        "enhance_completed",
        Some(200),
        Some(latency_ms),
        serde_json::json!({ "cache": cache }),
      )
      .await
  }

  /// §13: each lockout transition (failure counted, lockout engaged,
  /// lockout cleared) writes one row for later security review.
  pub async fn record_lockout_transition(
    &self,
    user_id: UserId,
    transition: &str,
    failed_login_count: i32,
  ) -> Result<(), sqlx::Error> {
    self
      .insert(
        Some(user_id),
        "/api/v1/auth/login",
        transition,
        None,
        None,
        serde_json::json!({ "failed_login_count": failed_login_count }),
      )
      .await
  }
}
