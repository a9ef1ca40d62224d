use chrono::{DateTime, Utc};
use promptforge_core::{PromptId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Row;
use sqlx::postgres::PgRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  Free,
  Pro,
  Enterprise,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
  pub id: UserId,
  pub email: String,
  pub username: String,
  pub password_hash: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  /// Stored as `{user,developer,admin}` text values; non-empty (§3).
  pub roles: Vec<String>,
  pub tier: Tier,
  pub active: bool,
  pub email_verified: bool,
  pub failed_login_count: i32,
  pub lockout_until: Option<DateTime<Utc>>,
  pub last_failed_login_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl UserRow {
  pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
    self.lockout_until.map(|until| until > now).unwrap_or(false)
  }
}

// `UserId` is a newtype defined in `promptforge_core`, which has no `sqlx`
// dependency (§10) — Rust's orphan rule forbids implementing the foreign
// `sqlx::Type`/`Decode` traits for it here, so rows are decoded manually
// from the raw `uuid::Uuid` column instead of via `#[derive(FromRow)]`.
impl sqlx::FromRow<'_, PgRow> for UserRow {
  fn from_row(row: &PgRow) -> sqlx::Result<Self> {
    Ok(Self {
      id: UserId::from_uuid(row.try_get("id")?),
      email: row.try_get("email")?,
      username: row.try_get("username")?,
      password_hash: row.try_get("password_hash")?,
      first_name: row.try_get("first_name")?,
      last_name: row.try_get("last_name")?,
      roles: row.try_get("roles")?,
      tier: row.try_get("tier")?,
      active: row.try_get("active")?,
      email_verified: row.try_get("email_verified")?,
      failed_login_count: row.try_get("failed_login_count")?,
      lockout_until: row.try_get("lockout_until")?,
      last_failed_login_at: row.try_get("last_failed_login_at")?,
      created_at: row.try_get("created_at")?,
      updated_at: row.try_get("updated_at")?,
    })
  }
}

/// Public-facing user representation (`/auth/profile`), never includes the
/// password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
  pub id: UserId,
  pub email: String,
  pub username: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub roles: Vec<String>,
  pub tier: Tier,
  pub active: bool,
  pub email_verified: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
  fn from(row: UserRow) -> Self {
    Self {
      id: row.id,
      email: row.email,
      username: row.username,
      first_name: row.first_name,
      last_name: row.last_name,
      roles: row.roles,
      tier: row.tier,
      active: row.active,
      email_verified: row.email_verified,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(Debug, Clone)]
pub struct SessionRow {
  pub id: SessionId,
  pub user_id: UserId,
  pub token_hash: String,
  pub device_fingerprint: Option<String>,
  pub user_agent: Option<String>,
  pub ip_address: Option<String>,
  pub issued_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub revoked: bool,
}

impl sqlx::FromRow<'_, PgRow> for SessionRow {
  fn from_row(row: &PgRow) -> sqlx::Result<Self> {
    Ok(Self {
      id: SessionId::from_uuid(row.try_get("id")?),
      user_id: UserId::from_uuid(row.try_get("user_id")?),
      token_hash: row.try_get("token_hash")?,
      device_fingerprint: row.try_get("device_fingerprint")?,
      user_agent: row.try_get("user_agent")?,
      ip_address: row.try_get("ip_address")?,
      issued_at: row.try_get("issued_at")?,
      expires_at: row.try_get("expires_at")?,
      revoked: row.try_get("revoked")?,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
  Simple,
  Moderate,
  Complex,
}

impl Complexity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Complexity::Simple => "simple",
      Complexity::Moderate => "moderate",
      Complexity::Complex => "complex",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromptHistoryRow {
  pub id: PromptId,
  pub owner_id: UserId,
  pub original_prompt: String,
  pub enhanced_prompt: String,
  pub intent: String,
  pub complexity: Complexity,
  pub techniques: Vec<String>,
  pub metadata: Value,
  pub rating: Option<i16>,
  pub feedback: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, PgRow> for PromptHistoryRow {
  fn from_row(row: &PgRow) -> sqlx::Result<Self> {
    Ok(Self {
      id: PromptId::from_uuid(row.try_get("id")?),
      owner_id: UserId::from_uuid(row.try_get("owner_id")?),
      original_prompt: row.try_get("original_prompt")?,
      enhanced_prompt: row.try_get("enhanced_prompt")?,
      intent: row.try_get("intent")?,
      complexity: row.try_get("complexity")?,
      techniques: row.try_get("techniques")?,
      metadata: row.try_get("metadata")?,
      rating: row.try_get("rating")?,
      feedback: row.try_get("feedback")?,
      created_at: row.try_get("created_at")?,
      updated_at: row.try_get("updated_at")?,
    })
  }
}
