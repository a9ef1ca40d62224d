use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domains::orchestration::EnhanceRequest;
use crate::models::UserProfile;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
  #[validate(email(message = "invalid email format"))]
  #[schema(example = "user@example.com")]
  pub email: String,

  #[validate(length(min = 3, max = 32, message = "username must be between 3 and 32 characters"))]
  #[schema(example = "alice")]
  pub username: String,

  pub password: String,
  pub confirm_password: String,

  #[schema(example = "Alice")]
  pub first_name: Option<String>,
  #[schema(example = "Anders")]
  pub last_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
  #[schema(example = "alice@example.com")]
  pub email_or_username: String,
  pub password: String,
  #[serde(default)]
  pub remember_me: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
  pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
  pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
  pub current_password: String,
  #[validate(length(min = 8, message = "new password must be at least 8 characters"))]
  pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
  pub first_name: Option<String>,
  pub last_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
  pub access_token: String,
  pub refresh_token: String,
  pub access_expires_at: DateTime<Utc>,
  pub refresh_expires_at: DateTime<Utc>,
  pub user: UserProfile,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchEnhanceRequest {
  pub items: Vec<EnhanceRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchEnhanceItemResult {
  pub index: usize,
  pub success: bool,
  pub result: Option<crate::domains::orchestration::EnhanceOutcome>,
  pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchEnhanceResponse {
  pub items: Vec<BatchEnhanceItemResult>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
  pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
  pub intent: String,
  pub complexity: String,
  pub confidence: f32,
  pub suggested_techniques: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryListParams {
  #[serde(default)]
  pub page: Option<i64>,
  #[serde(default)]
  pub limit: Option<i64>,
  #[serde(default)]
  pub search: Option<String>,
  #[serde(default)]
  pub technique: Option<String>,
  #[serde(default)]
  pub date_from: Option<DateTime<Utc>>,
  #[serde(default)]
  pub date_to: Option<DateTime<Utc>>,
  #[serde(default)]
  pub sort_by: Option<String>,
  #[serde(default)]
  pub dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryListResponse {
  pub items: Vec<crate::models::PromptHistoryRow>,
  pub page: i64,
  pub limit: i64,
  pub total_records: i64,
  pub total_pages: i64,
  pub has_next: bool,
  pub has_previous: bool,
}
