use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use promptforge_collab::CollaboratorError;
use promptforge_core::CoreError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// The `{ error, message, request_id }` body every error response carries
/// (§6).
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
  pub error: &'static str,
  pub message: String,
  pub request_id: String,
}

/// HTTP-aware error type for every handler. `AppError: From<CoreError>`
/// mirrors the teacher's `ErrorMapper` pattern: domain/repository code
/// returns `CoreError`, handlers return `AppError`.
#[derive(Debug, Error)]
pub enum AppError {
  #[error("invalid input: {0}")]
  InvalidInput(String),
  #[error("authentication required")]
  Unauthenticated,
  #[error("invalid credentials")]
  InvalidCredentials,
  #[error("account locked")]
  AccountLocked,
  #[error("forbidden")]
  Forbidden,
  #[error("not found")]
  NotFound,
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("rate limited")]
  RateLimited,
  #[error("invalid or expired refresh token")]
  InvalidRefresh,
  #[error("prompt generation failed")]
  GenerationFailed,
  #[error("collaborator unavailable: {0}")]
  CollaboratorUnavailable(String),
  #[error("request timed out in phase {0}")]
  Timeout(String),
  #[error("internal error")]
  Internal(String),
}

impl AppError {
  fn kind(&self) -> &'static str {
    match self {
      AppError::InvalidInput(_) => "InvalidInput",
      AppError::Unauthenticated => "Unauthenticated",
      AppError::InvalidCredentials => "InvalidCredentials",
      AppError::AccountLocked => "AccountLocked",
      AppError::Forbidden => "Forbidden",
      AppError::NotFound => "NotFound",
      AppError::Conflict(_) => "Conflict",
      AppError::RateLimited => "RateLimited",
      AppError::InvalidRefresh => "InvalidRefresh",
      AppError::GenerationFailed => "GenerationFailed",
      AppError::CollaboratorUnavailable(_) => "CollaboratorUnavailable",
      AppError::Timeout(_) => "Timeout",
      AppError::Internal(_) => "Internal",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
      AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
      AppError::AccountLocked => StatusCode::UNAUTHORIZED,
      AppError::Forbidden => StatusCode::FORBIDDEN,
      AppError::NotFound => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
      AppError::InvalidRefresh => StatusCode::UNAUTHORIZED,
      AppError::GenerationFailed => StatusCode::BAD_GATEWAY,
      AppError::CollaboratorUnavailable(_) => StatusCode::BAD_GATEWAY,
      AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
      AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Uniform messages for the two credential-related kinds (§4.2, §7):
  /// differ in logged kind, identical in what the client sees.
  fn message(&self) -> String {
    match self {
      AppError::InvalidCredentials => "invalid email/username or password".to_string(),
      AppError::AccountLocked => "invalid email/username or password".to_string(),
      AppError::NotFound | AppError::Forbidden => "resource not found".to_string(),
      other => other.to_string(),
    }
  }
}

impl From<CoreError> for AppError {
  fn from(err: CoreError) -> Self {
    match err {
      CoreError::InvalidInput(m) => AppError::InvalidInput(m),
      CoreError::Unauthenticated => AppError::Unauthenticated,
      CoreError::InvalidCredentials => AppError::InvalidCredentials,
      CoreError::AccountLocked(_) => AppError::AccountLocked,
      CoreError::Forbidden => AppError::Forbidden,
      CoreError::NotFound => AppError::NotFound,
      CoreError::Conflict(m) => AppError::Conflict(m),
      CoreError::RateLimited => AppError::RateLimited,
      CoreError::InvalidRefresh => AppError::InvalidRefresh,
      CoreError::GenerationFailed => AppError::GenerationFailed,
      CoreError::CollaboratorUnavailable(m) => AppError::CollaboratorUnavailable(m),
      CoreError::Timeout(phase) => AppError::Timeout(phase),
      CoreError::CacheUnavailable => {
        unreachable!("CacheUnavailable must be recovered locally before reaching a handler")
      }
      CoreError::Database(m) => AppError::Internal(m),
      CoreError::Internal(m) => AppError::Internal(m),
    }
  }
}

impl From<CollaboratorError> for AppError {
  fn from(err: CollaboratorError) -> Self {
    match err {
      CollaboratorError::Unavailable(name) => AppError::CollaboratorUnavailable(name),
      CollaboratorError::Timeout(name) => AppError::Timeout(name),
      CollaboratorError::Request { collaborator, .. } => {
        AppError::CollaboratorUnavailable(collaborator)
      }
      CollaboratorError::Decode { collaborator, .. } => {
        AppError::CollaboratorUnavailable(collaborator)
      }
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = ErrorBody {
      error: self.kind(),
      message: self.message(),
      request_id: Uuid::new_v4().to_string(),
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn credential_errors_share_a_message() {
    let invalid = AppError::InvalidCredentials;
    let locked = AppError::AccountLocked;
    assert_eq!(invalid.message(), locked.message());
    assert_ne!(invalid.kind(), locked.kind());
  }

  #[test]
  fn not_found_and_forbidden_are_indistinguishable_in_body() {
    assert_eq!(AppError::NotFound.message(), AppError::Forbidden.message());
  }
}
