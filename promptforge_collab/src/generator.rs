use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{CollaboratorClient, CollaboratorError};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
  pub text: String,
  pub intent: String,
  pub complexity: String,
  pub techniques: Vec<String>,
  #[serde(default)]
  pub context: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
  pub enhanced_text: String,
  pub tokens_used: u32,
  pub model_version: String,
}

/// Mockable seam over the generator collaborator (§11.4).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeneratorLike: Send + Sync {
  async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, CollaboratorError>;
}

pub struct GeneratorClient {
  inner: CollaboratorClient,
}

impl GeneratorClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
    Self {
      inner: CollaboratorClient::new("generator", base_url, timeout),
    }
  }

  pub async fn circuit_state_label(&self) -> &'static str {
    self.inner.circuit_state_label().await
  }

  /// Generator failure is fatal (§4.5 step 6) — callers must map any `Err`
  /// here onto `GenerationFailed` and never fall back silently.
  pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, CollaboratorError> {
    self.inner.post_json("/generate", &request).await
  }
}

#[async_trait]
impl GeneratorLike for GeneratorClient {
  async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, CollaboratorError> {
    GeneratorClient::generate(self, request).await
  }
}
