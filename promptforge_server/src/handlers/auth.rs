use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use promptforge_core::{AuthContext, AuthTokens, Principal};
use validator::Validate;

use crate::domains::auth::service;
use crate::dtos::{
  AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, RefreshRequest,
  RegisterRequest, UpdateProfileRequest,
};
use crate::error::AppError;
use crate::models::UserRow;
use crate::state::AppState;

fn auth_context_from(headers: &HeaderMap) -> AuthContext {
  let user_agent = headers
    .get(axum::http::header::USER_AGENT)
    .and_then(|v| v.to_str().ok())
    .map(str::to_string);
  let ip_address = headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(|v| v.trim().to_string());

  AuthContext {
    user_agent,
    ip_address,
  }
}

fn validation_error(err: validator::ValidationErrors) -> AppError {
  AppError::InvalidInput(err.to_string())
}

fn auth_response(user: UserRow, tokens: AuthTokens) -> AuthResponse {
  AuthResponse {
    access_token: tokens.access_token,
    refresh_token: tokens.refresh_token,
    access_expires_at: tokens.access_expires_at,
    refresh_expires_at: tokens.refresh_expires_at,
    user: user.into(),
  }
}

#[utoipa::path(
  post,
  path = "/api/v1/auth/register",
  request_body = RegisterRequest,
  responses(
    (status = 201, description = "User registered", body = AuthResponse),
    (status = 400, description = "Invalid input"),
    (status = 409, description = "Email or username already taken"),
  ),
  tag = "auth"
)]
pub async fn register(
  State(state): State<AppState>,
  headers: HeaderMap,
  Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
  payload.validate().map_err(validation_error)?;
  let auth_context = auth_context_from(&headers);

  let (user, tokens) = service::register(
    &state.users,
    &state.sessions,
    &state.token_manager,
    &payload.email,
    &payload.username,
    &payload.password,
    &payload.confirm_password,
    payload.first_name.as_deref(),
    payload.last_name.as_deref(),
    &auth_context,
  )
  .await?;

  Ok((StatusCode::CREATED, Json(auth_response(user, tokens))))
}

#[utoipa::path(
  post,
  path = "/api/v1/auth/login",
  request_body = LoginRequest,
  responses(
    (status = 200, description = "Login successful", body = AuthResponse),
    (status = 401, description = "Invalid credentials or account locked"),
  ),
  tag = "auth"
)]
pub async fn login(
  State(state): State<AppState>,
  headers: HeaderMap,
  Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
  let auth_context = auth_context_from(&headers);

  let (user, tokens) = service::login(
    &state.users,
    &state.sessions,
    &state.audit,
    &state.token_manager,
    &payload.email_or_username,
    &payload.password,
    payload.remember_me,
    &auth_context,
  )
  .await?;

  Ok(Json(auth_response(user, tokens)))
}

#[utoipa::path(
  post,
  path = "/api/v1/auth/refresh",
  request_body = RefreshRequest,
  responses(
    (status = 200, description = "Rotated refresh/access pair", body = AuthResponse),
    (status = 401, description = "Invalid or expired refresh token"),
  ),
  tag = "auth"
)]
pub async fn refresh(
  State(state): State<AppState>,
  headers: HeaderMap,
  Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
  let auth_context = auth_context_from(&headers);

  let (user, tokens) = service::refresh(
    &state.users,
    &state.sessions,
    &state.token_manager,
    &payload.refresh_token,
    &auth_context,
  )
  .await?;

  Ok(Json(auth_response(user, tokens)))
}

#[utoipa::path(
  post,
  path = "/api/v1/auth/logout",
  security(("access_token" = [])),
  request_body = LogoutRequest,
  responses((status = 204, description = "Session revoked")),
  tag = "auth"
)]
pub async fn logout(
  State(state): State<AppState>,
  Json(payload): Json<LogoutRequest>,
) -> Result<StatusCode, AppError> {
  service::logout(&state.sessions, &payload.refresh_token).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
  get,
  path = "/api/v1/auth/profile",
  security(("access_token" = [])),
  responses((status = 200, description = "Current user", body = crate::models::UserProfile)),
  tag = "auth"
)]
pub async fn get_profile(
  State(state): State<AppState>,
  Extension(principal): Extension<Principal>,
) -> Result<Json<crate::models::UserProfile>, AppError> {
  let user = state
    .users
    .find_by_id(principal.user_id)
    .await?
    .ok_or(AppError::NotFound)?;
  Ok(Json(user.into()))
}

#[utoipa::path(
  put,
  path = "/api/v1/auth/profile",
  security(("access_token" = [])),
  request_body = UpdateProfileRequest,
  responses((status = 200, description = "Updated user", body = crate::models::UserProfile)),
  tag = "auth"
)]
pub async fn update_profile(
  State(state): State<AppState>,
  Extension(principal): Extension<Principal>,
  Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<crate::models::UserProfile>, AppError> {
  let user = service::update_profile(
    &state.users,
    principal.user_id,
    payload.first_name.as_deref(),
    payload.last_name.as_deref(),
  )
  .await?;
  Ok(Json(user.into()))
}

#[utoipa::path(
  post,
  path = "/api/v1/auth/change-password",
  security(("access_token" = [])),
  request_body = ChangePasswordRequest,
  responses(
    (status = 204, description = "Password changed"),
    (status = 401, description = "Current password incorrect"),
  ),
  tag = "auth"
)]
pub async fn change_password(
  State(state): State<AppState>,
  Extension(principal): Extension<Principal>,
  Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
  payload.validate().map_err(validation_error)?;
  service::change_password(
    &state.users,
    principal.user_id,
    &payload.current_password,
    &payload.new_password,
  )
  .await?;
  Ok(StatusCode::NO_CONTENT)
}
