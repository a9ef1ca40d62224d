//! The shared resilience envelope every collaborator client is wrapped in
//! (§4.4): a per-collaborator circuit breaker plus a retry-with-backoff
//! helper. Kept free of any one collaborator's request/response shape.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
enum CircuitState {
  Closed,
  Open(Instant),
  HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
  pub failure_threshold: u64,
  pub success_threshold: u64,
  pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
  fn default() -> Self {
    Self {
      failure_threshold: 5,
      success_threshold: 1,
      open_timeout: Duration::from_secs(60),
    }
  }
}

/// Closed → Open after `failure_threshold` consecutive failures; Open →
/// HalfOpen after `open_timeout` elapses; HalfOpen → Closed on the first
/// success, or back to Open on any failure.
pub struct CircuitBreaker {
  name: String,
  state: RwLock<CircuitState>,
  failure_count: AtomicU64,
  success_count: AtomicU64,
  config: CircuitBreakerConfig,
}

impl CircuitBreaker {
  pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
    Self {
      name: name.into(),
      state: RwLock::new(CircuitState::Closed),
      failure_count: AtomicU64::new(0),
      success_count: AtomicU64::new(0),
      config,
    }
  }

  /// Returns whether a call should be attempted. Open circuits that have
  /// outlived `open_timeout` transition to half-open and allow exactly one
  /// probing call through.
  pub async fn is_available(&self) -> bool {
    let mut state = self.state.write().await;
    match *state {
      CircuitState::Closed | CircuitState::HalfOpen => true,
      CircuitState::Open(opened_at) => {
        if opened_at.elapsed() >= self.config.open_timeout {
          *state = CircuitState::HalfOpen;
          true
        } else {
          false
        }
      }
    }
  }

  pub async fn record_success(&self) {
    let mut state = self.state.write().await;
    match *state {
      CircuitState::HalfOpen => {
        let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
        if successes >= self.config.success_threshold {
          *state = CircuitState::Closed;
          self.failure_count.store(0, Ordering::SeqCst);
          self.success_count.store(0, Ordering::SeqCst);
        }
      }
      CircuitState::Closed => {
        self.failure_count.store(0, Ordering::SeqCst);
      }
      CircuitState::Open(_) => {}
    }
  }

  pub async fn record_failure(&self) {
    let mut state = self.state.write().await;
    let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
    match *state {
      CircuitState::Closed if failures >= self.config.failure_threshold => {
        warn!(
          collaborator = %self.name,
          failures,
          "circuit breaker opening"
        );
        *state = CircuitState::Open(Instant::now());
      }
      CircuitState::HalfOpen => {
        *state = CircuitState::Open(Instant::now());
        self.success_count.store(0, Ordering::SeqCst);
      }
      _ => {}
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// A stable label for the `circuit_breaker_state{collaborator}` gauge.
  pub async fn state_label(&self) -> &'static str {
    match *self.state.read().await {
      CircuitState::Closed => "closed",
      CircuitState::Open(_) => "open",
      CircuitState::HalfOpen => "half_open",
    }
  }
}

pub trait RetryableError {
  fn is_retryable(&self) -> bool;
}

/// Retries `f` up to `max_retries` times on a retryable error, with
/// exponential backoff (100ms * 2^attempt) plus up to 50ms of jitter,
/// matching the pattern this workspace's auth layer already uses for its
/// own collaborator: the user-lookup retry.
pub async fn with_retry<F, Fut, T, E>(max_retries: u32, mut f: F) -> Result<T, E>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: RetryableError,
{
  let mut attempt = 0;
  loop {
    match f().await {
      Ok(value) => return Ok(value),
      Err(err) if attempt < max_retries && err.is_retryable() => {
        let backoff_ms = 100u64.saturating_mul(1u64 << attempt);
        let jitter_ms = rand::random::<u64>() % 50;
        tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
        attempt += 1;
      }
      Err(err) => return Err(err),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicU32;

  #[tokio::test]
  async fn opens_after_threshold_failures() {
    let cb = CircuitBreaker::new(
      "classifier",
      CircuitBreakerConfig {
        failure_threshold: 3,
        ..Default::default()
      },
    );
    for _ in 0..3 {
      cb.record_failure().await;
    }
    assert!(!cb.is_available().await);
  }

  #[tokio::test]
  async fn half_open_closes_on_success() {
    let cb = CircuitBreaker::new(
      "selector",
      CircuitBreakerConfig {
        failure_threshold: 1,
        success_threshold: 1,
        open_timeout: Duration::from_millis(1),
      },
    );
    cb.record_failure().await;
    assert!(!cb.is_available().await);
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(cb.is_available().await);
    cb.record_success().await;
    assert_eq!(cb.state_label().await, "closed");
  }

  #[derive(Debug)]
  struct Flaky;
  impl RetryableError for Flaky {
    fn is_retryable(&self) -> bool {
      true
    }
  }

  #[tokio::test]
  async fn retries_until_success() {
    let attempts = AtomicU32::new(0);
    let result: Result<&str, Flaky> = with_retry(3, || async {
      if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
        Err(Flaky)
      } else {
        Ok("ok")
      }
    })
    .await;
    assert_eq!(result.unwrap(), "ok");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn stops_retrying_at_budget() {
    let attempts = AtomicU32::new(0);
    let result: Result<(), Flaky> = with_retry(2, || async {
      attempts.fetch_add(1, Ordering::SeqCst);
      Err(Flaky)
    })
    .await;
    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }
}
