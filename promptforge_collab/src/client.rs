use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::envelope::{CircuitBreaker, CircuitBreakerConfig, RetryableError, with_retry};

#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
  #[error("{0} is unavailable (circuit open)")]
  Unavailable(String),

  #[error("{collaborator} request failed: {message}")]
  Request {
    collaborator: String,
    message: String,
    retryable: bool,
  },

  #[error("{collaborator} response could not be decoded: {message}")]
  Decode { collaborator: String, message: String },

  #[error("{0} request timed out")]
  Timeout(String),
}

impl From<CollaboratorError> for promptforge_core::CoreError {
  fn from(err: CollaboratorError) -> Self {
    match err {
      CollaboratorError::Unavailable(name) => promptforge_core::CoreError::CollaboratorUnavailable(name),
      CollaboratorError::Timeout(name) => promptforge_core::CoreError::Timeout(name),
      CollaboratorError::Request { collaborator, .. } => {
        promptforge_core::CoreError::CollaboratorUnavailable(collaborator)
      }
      CollaboratorError::Decode { collaborator, .. } => {
        promptforge_core::CoreError::CollaboratorUnavailable(collaborator)
      }
    }
  }
}

impl RetryableError for CollaboratorError {
  fn is_retryable(&self) -> bool {
    matches!(
      self,
      CollaboratorError::Request {
        retryable: true,
        ..
      } | CollaboratorError::Timeout(_)
    )
  }
}

/// Up to 2 retries on connection errors and 503/504 (§4.4).
const MAX_RETRIES: u32 = 2;

/// A typed HTTP client to one collaborator, wrapped in the shared
/// resilience envelope. `Classifier`/`Selector`/`Generator` each hold one
/// of these rather than re-implementing retry/circuit-break/metrics.
pub struct CollaboratorClient {
  name: &'static str,
  base_url: String,
  http: Client,
  breaker: CircuitBreaker,
}

impl CollaboratorClient {
  pub fn new(name: &'static str, base_url: impl Into<String>, timeout: Duration) -> Self {
    let http = Client::builder()
      .timeout(timeout)
      .build()
      .expect("reqwest client builds with a fixed timeout");

    Self {
      name,
      base_url: base_url.into(),
      http,
      breaker: CircuitBreaker::new(name, CircuitBreakerConfig::default()),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub async fn circuit_state_label(&self) -> &'static str {
    self.breaker.state_label().await
  }

  /// POSTs `body` to `path` and decodes the JSON response, under retry and
  /// the circuit breaker. Never retries 4xx or once the circuit is open.
  pub async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, CollaboratorError>
  where
    Req: Serialize + Sync,
    Resp: DeserializeOwned,
  {
    if !self.breaker.is_available().await {
      return Err(CollaboratorError::Unavailable(self.name.to_string()));
    }

    let url = format!("{}{}", self.base_url, path);
    let started = std::time::Instant::now();

    let result = with_retry(MAX_RETRIES, || async {
      debug!(collaborator = self.name, %url, "calling collaborator");
      let response = self.http.post(&url).json(body).send().await.map_err(|e| {
        let retryable = e.is_connect() || e.is_timeout();
        CollaboratorError::Request {
          collaborator: self.name.to_string(),
          message: e.to_string(),
          retryable,
        }
      })?;

      let status = response.status();
      if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT {
        return Err(CollaboratorError::Request {
          collaborator: self.name.to_string(),
          message: format!("collaborator returned {status}"),
          retryable: true,
        });
      }
      if !status.is_success() {
        return Err(CollaboratorError::Request {
          collaborator: self.name.to_string(),
          message: format!("collaborator returned {status}"),
          retryable: false,
        });
      }

      response
        .json::<Resp>()
        .await
        .map_err(|e| CollaboratorError::Decode {
          collaborator: self.name.to_string(),
          message: e.to_string(),
        })
    })
    .await;

    let elapsed = started.elapsed();
    let status_label = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!("collaborator_calls_total", "collaborator" => self.name, "status" => status_label)
      .increment(1);
    metrics::histogram!("collaborator_call_duration_seconds", "collaborator" => self.name)
      .record(elapsed.as_secs_f64());

    match result {
      Ok(value) => {
        self.breaker.record_success().await;
        Ok(value)
      }
      Err(err) => {
        warn!(collaborator = self.name, error = %err, "collaborator call failed");
        self.breaker.record_failure().await;
        Err(err)
      }
    }
  }
}
