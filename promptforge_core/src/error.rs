use chrono::{DateTime, Utc};
use thiserror::Error;

/// Business-level error taxonomy shared by every domain and repository in the
/// workspace. Carries no HTTP concept — `promptforge_server::error::AppError`
/// maps each variant onto a status code and the `{error, message, request_id}`
/// response body.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("authentication required")]
  Unauthenticated,

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("account locked until {0}")]
  AccountLocked(DateTime<Utc>),

  #[error("forbidden")]
  Forbidden,

  #[error("not found")]
  NotFound,

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("rate limited")]
  RateLimited,

  /// A refresh token was reused, revoked, or never existed. Kept distinct
  /// from `Unauthenticated` because refresh-race semantics (§8) depend on
  /// callers being able to match on it specifically.
  #[error("invalid or expired refresh token")]
  InvalidRefresh,

  #[error("generation failed")]
  GenerationFailed,

  #[error("collaborator unavailable: {0}")]
  CollaboratorUnavailable(String),

  #[error("request timed out in phase {0}")]
  Timeout(String),

  /// Recovered locally by the cache layer; never surfaced past it, but
  /// modeled explicitly so call sites can log rather than guess.
  #[error("cache backend unavailable")]
  CacheUnavailable,

  #[error("database error: {0}")]
  Database(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl CoreError {
  /// Map a unique-constraint name from the `users`/`sessions` migrations
  /// (§12) onto the taxonomy. The repository layer (which owns the `sqlx`
  /// dependency) calls this after inspecting the raw database error; this
  /// crate never depends on `sqlx` itself.
  pub fn conflict_from_constraint(constraint: &str) -> Self {
    match constraint {
      "users_email_key" => CoreError::Conflict("a user with this email already exists".into()),
      "users_username_key" => {
        CoreError::Conflict("a user with this username already exists".into())
      }
      "sessions_token_hash_key" => CoreError::Conflict("session token already exists".into()),
      other => CoreError::Conflict(format!("resource already exists ({other})")),
    }
  }

  pub fn database(msg: impl Into<String>) -> Self {
    CoreError::Database(msg.into())
  }
}

impl From<jsonwebtoken::errors::Error> for CoreError {
  fn from(err: jsonwebtoken::errors::Error) -> Self {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
      ErrorKind::ExpiredSignature => CoreError::Unauthenticated,
      _ => CoreError::Unauthenticated,
    }
  }
}

impl From<anyhow::Error> for CoreError {
  fn from(err: anyhow::Error) -> Self {
    CoreError::Internal(err.to_string())
  }
}

/// Maps the crate-local `CoreError` onto whatever richer, HTTP-aware error
/// type a downstream crate defines (`promptforge_server::error::AppError`).
pub trait ErrorMapper {
  type Error;

  fn map_error(error: CoreError) -> Self::Error;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unique_violation_maps_to_conflict() {
    let err = CoreError::conflict_from_constraint("users_email_key");
    assert!(matches!(err, CoreError::Conflict(_)));
  }
}
