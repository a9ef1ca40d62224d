use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{CollaboratorClient, CollaboratorError};

#[derive(Debug, Clone, Serialize)]
pub struct SelectRequest {
  pub text: String,
  pub intent: String,
  /// Pre-normalized by the caller (§4.5 step 4) before this client is ever
  /// invoked — the selector is never asked to normalize complexity itself.
  pub complexity: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub prefer_techniques: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectResponse {
  pub techniques: Vec<String>,
  pub primary_technique: String,
  pub confidence: f32,
}

/// Mockable seam over the selector collaborator (§11.4).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SelectorLike: Send + Sync {
  async fn select(&self, request: SelectRequest) -> Result<SelectResponse, CollaboratorError>;
}

pub struct SelectorClient {
  inner: CollaboratorClient,
}

impl SelectorClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
    Self {
      inner: CollaboratorClient::new("selector", base_url, timeout),
    }
  }

  pub async fn circuit_state_label(&self) -> &'static str {
    self.inner.circuit_state_label().await
  }

  pub async fn select(&self, request: SelectRequest) -> Result<SelectResponse, CollaboratorError> {
    self.inner.post_json("/select", &request).await
  }
}

#[async_trait]
impl SelectorLike for SelectorClient {
  async fn select(&self, request: SelectRequest) -> Result<SelectResponse, CollaboratorError> {
    SelectorClient::select(self, request).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn mock_selector_like_substitutes_for_real_calls() {
    let mut mock = MockSelectorLike::new();
    mock.expect_select().withf(|req| req.intent == "question_answering").returning(|_| {
      Ok(SelectResponse {
        techniques: vec!["chain_of_thought".into()],
        primary_technique: "chain_of_thought".into(),
        confidence: 0.9,
      })
    });

    let response = mock
      .select(SelectRequest {
        text: "hello".into(),
        intent: "question_answering".into(),
        complexity: "simple".into(),
        prefer_techniques: None,
      })
      .await
      .unwrap();

    assert_eq!(response.primary_technique, "chain_of_thought");
  }
}
