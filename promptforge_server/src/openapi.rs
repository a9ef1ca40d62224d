use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{domains, dtos, handlers, models};

#[derive(OpenApi)]
#[openapi(
  paths(
    handlers::auth::register,
    handlers::auth::login,
    handlers::auth::refresh,
    handlers::auth::logout,
    handlers::auth::get_profile,
    handlers::auth::update_profile,
    handlers::auth::change_password,
    handlers::enhance::enhance,
    handlers::enhance::enhance_batch,
    handlers::enhance::analyze,
    handlers::history::list_history,
    handlers::history::get_history_item,
    handlers::history::rerun_history_item,
    handlers::techniques::list_techniques,
  ),
  components(schemas(
    dtos::AuthResponse,
    dtos::RegisterRequest,
    dtos::LoginRequest,
    dtos::RefreshRequest,
    dtos::LogoutRequest,
    dtos::ChangePasswordRequest,
    dtos::UpdateProfileRequest,
    dtos::BatchEnhanceRequest,
    dtos::BatchEnhanceItemResult,
    dtos::BatchEnhanceResponse,
    dtos::AnalyzeRequest,
    dtos::AnalyzeResponse,
    dtos::HistoryListResponse,
    domains::orchestration::EnhanceRequest,
    domains::orchestration::EnhanceResult,
    domains::orchestration::EnhanceMetadata,
    domains::orchestration::EnhanceOutcome,
    domains::orchestration::techniques::TechniqueDescriptor,
    handlers::techniques::TechniqueCatalogResponse,
    models::UserProfile,
    models::PromptHistoryRow,
    models::Tier,
    models::Complexity,
  )),
  modifiers(&SecurityAddon),
  tags(
    (name = "auth", description = "Registration, login, session, and profile operations"),
    (name = "enhance", description = "Prompt enhancement orchestration"),
    (name = "history", description = "Owner-scoped prompt history"),
    (name = "techniques", description = "Static technique catalog"),
  )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
  fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
    if let Some(components) = openapi.components.as_mut() {
      components.add_security_scheme(
        "access_token",
        SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
      );
    }
  }
}
