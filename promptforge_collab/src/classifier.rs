use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{CollaboratorClient, CollaboratorError};

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyRequest {
  pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
  pub intent: String,
  pub complexity: String,
  pub confidence: f32,
  #[serde(default)]
  pub suggested_techniques: Vec<String>,
}

/// Deterministic default techniques per intent, used when the classifier
/// omits `suggestedTechniques` (§4.4: "the client normalizes missing field
/// to a deterministic default per intent").
pub fn default_techniques_for_intent(intent: &str) -> Vec<String> {
  match intent {
    "code_generation" => vec!["chain_of_thought".into(), "few_shot".into()],
    "question_answering" => vec!["chain_of_thought".into()],
    "summarization" => vec!["zero_shot".into()],
    "creative_writing" => vec!["role_prompting".into()],
    _ => vec!["chain_of_thought".into()],
  }
}

/// Mockable seam over the classifier collaborator (§11.4): orchestration
/// code depending on this instead of the concrete `ClassifierClient` can be
/// unit-tested against `MockClassifierLike`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassifierLike: Send + Sync {
  async fn classify(&self, text: &str) -> Result<ClassifyResponse, CollaboratorError>;
}

pub struct ClassifierClient {
  inner: CollaboratorClient,
}

impl ClassifierClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
    Self {
      inner: CollaboratorClient::new("classifier", base_url, timeout),
    }
  }

  pub async fn circuit_state_label(&self) -> &'static str {
    self.inner.circuit_state_label().await
  }

  pub async fn classify(&self, text: &str) -> Result<ClassifyResponse, CollaboratorError> {
    let mut response = self
      .inner
      .post_json(
        "/classify",
        &ClassifyRequest {
          text: text.to_string(),
        },
      )
      .await?;

    if response.suggested_techniques.is_empty() {
      response.suggested_techniques = default_techniques_for_intent(&response.intent);
    }
    Ok(response)
  }
}

#[async_trait]
impl ClassifierLike for ClassifierClient {
  async fn classify(&self, text: &str) -> Result<ClassifyResponse, CollaboratorError> {
    ClassifierClient::classify(self, text).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_intent_falls_back_to_chain_of_thought() {
    let techniques = default_techniques_for_intent("nonsense_intent");
    assert_eq!(techniques, vec!["chain_of_thought".to_string()]);
  }

  #[test]
  fn code_generation_gets_few_shot() {
    let techniques = default_techniques_for_intent("code_generation");
    assert!(techniques.contains(&"few_shot".to_string()));
  }
}
