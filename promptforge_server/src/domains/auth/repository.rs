use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promptforge_core::{CoreError, SessionId, UserId};
use sqlx::PgPool;

use crate::models::{SessionRow, Tier, UserRow};

/// Mockable seam over the `users` table (§11.4): `service::login`/`register`
/// depend on this instead of the concrete `PgUserRepository`, so unit tests
/// can substitute `MockUserRepository` instead of standing up Postgres.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
  async fn find_by_email_or_username(&self, identifier: &str) -> Result<Option<UserRow>, CoreError>;
  async fn find_by_id(&self, id: UserId) -> Result<Option<UserRow>, CoreError>;
  async fn create(
    &self,
    email: &str,
    username: &str,
    password_hash: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<UserRow, CoreError>;
  async fn record_login_failure(
    &self,
    id: UserId,
    lockout_until: Option<DateTime<Utc>>,
  ) -> Result<(), CoreError>;
  async fn reset_login_failures(&self, id: UserId) -> Result<(), CoreError>;
  async fn update_profile(
    &self,
    id: UserId,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<UserRow, CoreError>;
  async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), CoreError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
  pool: PgPool,
}

impl PgUserRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn find_by_email_or_username(
    &self,
    identifier: &str,
  ) -> Result<Option<UserRow>, CoreError> {
    sqlx::query_as::<_, UserRow>(
      "SELECT * FROM users WHERE email = $1 OR username = $1",
    )
    .bind(identifier)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))
  }

  pub async fn find_by_id(&self, id: UserId) -> Result<Option<UserRow>, CoreError> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
      .bind(id.into_uuid())
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| CoreError::database(e.to_string()))
  }

  #[allow(clippy::too_many_arguments)]
  pub async fn create(
    &self,
    email: &str,
    username: &str,
    password_hash: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<UserRow, CoreError> {
    sqlx::query_as::<_, UserRow>(
      r#"
      INSERT INTO users (id, email, username, password_hash, first_name, last_name, roles, tier)
      VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, ARRAY['user'], 'free')
      RETURNING *
      "#,
    )
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| match e {
      sqlx::Error::Database(ref db_err) => db_err
        .constraint()
        .map(CoreError::conflict_from_constraint)
        .unwrap_or_else(|| CoreError::database(e.to_string())),
      other => CoreError::database(other.to_string()),
    })
  }

  pub async fn record_login_failure(
    &self,
    id: UserId,
    lockout_until: Option<DateTime<Utc>>,
  ) -> Result<(), CoreError> {
    sqlx::query(
      "UPDATE users SET failed_login_count = failed_login_count + 1, lockout_until = $2, last_failed_login_at = now() WHERE id = $1",
    )
    .bind(id.into_uuid())
    .bind(lockout_until)
    .execute(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))?;
    Ok(())
  }

  pub async fn reset_login_failures(&self, id: UserId) -> Result<(), CoreError> {
    sqlx::query(
      "UPDATE users SET failed_login_count = 0, lockout_until = NULL WHERE id = $1",
    )
    .bind(id.into_uuid())
    .execute(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))?;
    Ok(())
  }

  pub async fn update_profile(
    &self,
    id: UserId,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<UserRow, CoreError> {
    sqlx::query_as::<_, UserRow>(
      "UPDATE users SET first_name = $2, last_name = $3, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id.into_uuid())
    .bind(first_name)
    .bind(last_name)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))
  }

  pub async fn update_password_hash(
    &self,
    id: UserId,
    password_hash: &str,
  ) -> Result<(), CoreError> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
      .bind(id.into_uuid())
      .bind(password_hash)
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::database(e.to_string()))?;
    Ok(())
  }

  #[allow(dead_code)]
  pub async fn set_tier(&self, id: UserId, tier: Tier) -> Result<(), CoreError> {
    sqlx::query("UPDATE users SET tier = $2 WHERE id = $1")
      .bind(id.into_uuid())
      .bind(tier)
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::database(e.to_string()))?;
    Ok(())
  }
}

#[async_trait]
impl UserRepository for PgUserRepository {
  async fn find_by_email_or_username(&self, identifier: &str) -> Result<Option<UserRow>, CoreError> {
    PgUserRepository::find_by_email_or_username(self, identifier).await
  }

  async fn find_by_id(&self, id: UserId) -> Result<Option<UserRow>, CoreError> {
    PgUserRepository::find_by_id(self, id).await
  }

  async fn create(
    &self,
    email: &str,
    username: &str,
    password_hash: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<UserRow, CoreError> {
    PgUserRepository::create(self, email, username, password_hash, first_name, last_name).await
  }

  async fn record_login_failure(
    &self,
    id: UserId,
    lockout_until: Option<DateTime<Utc>>,
  ) -> Result<(), CoreError> {
    PgUserRepository::record_login_failure(self, id, lockout_until).await
  }

  async fn reset_login_failures(&self, id: UserId) -> Result<(), CoreError> {
    PgUserRepository::reset_login_failures(self, id).await
  }

  async fn update_profile(
    &self,
    id: UserId,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<UserRow, CoreError> {
    PgUserRepository::update_profile(self, id, first_name, last_name).await
  }

  async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), CoreError> {
    PgUserRepository::update_password_hash(self, id, password_hash).await
  }
}

/// Mockable seam over the `sessions` table (§11.4).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
  async fn insert(
    &self,
    user_id: UserId,
    token_hash: &str,
    device_fingerprint: Option<&str>,
    user_agent: Option<&str>,
    ip_address: Option<&str>,
    expires_at: DateTime<Utc>,
  ) -> Result<SessionRow, CoreError>;
  async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<SessionRow>, CoreError>;
  async fn revoke_if_active(&self, id: SessionId) -> Result<bool, CoreError>;
  async fn revoke(&self, id: SessionId) -> Result<(), CoreError>;
}

#[derive(Clone)]
pub struct PgSessionRepository {
  pool: PgPool,
}

impl PgSessionRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[allow(clippy::too_many_arguments)]
  pub async fn insert(
    &self,
    user_id: UserId,
    token_hash: &str,
    device_fingerprint: Option<&str>,
    user_agent: Option<&str>,
    ip_address: Option<&str>,
    expires_at: DateTime<Utc>,
  ) -> Result<SessionRow, CoreError> {
    sqlx::query_as::<_, SessionRow>(
      r#"
      INSERT INTO sessions (id, user_id, token_hash, device_fingerprint, user_agent, ip_address, issued_at, expires_at, revoked)
      VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, now(), $6, false)
      RETURNING *
      "#,
    )
    .bind(user_id.into_uuid())
    .bind(token_hash)
    .bind(device_fingerprint)
    .bind(user_agent)
    .bind(ip_address)
    .bind(expires_at)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| match e {
      sqlx::Error::Database(ref db_err) => db_err
        .constraint()
        .map(CoreError::conflict_from_constraint)
        .unwrap_or_else(|| CoreError::database(e.to_string())),
      other => CoreError::database(other.to_string()),
    })
  }

  pub async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<SessionRow>, CoreError> {
    sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = $1")
      .bind(token_hash)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| CoreError::database(e.to_string()))
  }

  /// Atomically revokes the session iff it is currently unrevoked (§4.2's
  /// `Refresh` invariant: concurrent refresh with the same token results in
  /// exactly one success). Returns `true` iff this call performed the
  /// revocation.
  pub async fn revoke_if_active(&self, id: SessionId) -> Result<bool, CoreError> {
    let result = sqlx::query(
      "UPDATE sessions SET revoked = true WHERE id = $1 AND revoked = false",
    )
    .bind(id.into_uuid())
    .execute(&self.pool)
    .await
    .map_err(|e| CoreError::database(e.to_string()))?;

    Ok(result.rows_affected() == 1)
  }

  pub async fn revoke(&self, id: SessionId) -> Result<(), CoreError> {
    sqlx::query("UPDATE sessions SET revoked = true WHERE id = $1")
      .bind(id.into_uuid())
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::database(e.to_string()))?;
    Ok(())
  }

  #[allow(dead_code)]
  pub async fn revoke_all_for_user(&self, user_id: UserId) -> Result<(), CoreError> {
    sqlx::query("UPDATE sessions SET revoked = true WHERE user_id = $1")
      .bind(user_id.into_uuid())
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::database(e.to_string()))?;
    Ok(())
  }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
  async fn insert(
    &self,
    user_id: UserId,
    token_hash: &str,
    device_fingerprint: Option<&str>,
    user_agent: Option<&str>,
    ip_address: Option<&str>,
    expires_at: DateTime<Utc>,
  ) -> Result<SessionRow, CoreError> {
    PgSessionRepository::insert(
      self,
      user_id,
      token_hash,
      device_fingerprint,
      user_agent,
      ip_address,
      expires_at,
    )
    .await
  }

  async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<SessionRow>, CoreError> {
    PgSessionRepository::find_by_token_hash(self, token_hash).await
  }

  async fn revoke_if_active(&self, id: SessionId) -> Result<bool, CoreError> {
    PgSessionRepository::revoke_if_active(self, id).await
  }

  async fn revoke(&self, id: SessionId) -> Result<(), CoreError> {
    PgSessionRepository::revoke(self, id).await
  }
}
