use std::time::Duration;

use promptforge_core::{CoreError, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::domains::audit::PgApiUsageRepository;
use crate::domains::cache::redis_cache::RedisCacheService;
use crate::domains::cache::{enhancement_key, fingerprint_hex, intent_key, normalize_text, ttl};
use crate::domains::history::repository::HistoryRepository;
use crate::domains::orchestration::{complexity, techniques};
use crate::models::Complexity;
use crate::state::AppState;
use promptforge_collab::classifier::{default_techniques_for_intent, ClassifyResponse};
use promptforge_collab::{GenerateRequest, SelectRequest};

/// Total user-observed deadline across every orchestration step (§4.5).
const ORCHESTRATION_DEADLINE: Duration = Duration::from_secs(30);
const HISTORY_PERSIST_MAX_ATTEMPTS: u32 = 3;
const HISTORY_PERSIST_BUDGET: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnhanceRequest {
  pub text: String,
  #[serde(default)]
  pub context: Option<Value>,
  #[serde(default)]
  pub prefer_techniques: Option<Vec<String>>,
  #[serde(default)]
  pub target_complexity: Option<String>,
}

/// The cacheable part of an enhancement outcome. Stored verbatim under the
/// fingerprint key; request-specific flags (cache hit, fallbacks taken) are
/// layered on top by [`EnhanceOutcome`] and never persisted into the cache
/// entry itself, so replaying a cached result never lies about whether
/// *this* call actually hit cache.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnhanceResult {
  pub enhanced_text: String,
  pub intent: String,
  pub complexity: String,
  pub techniques: Vec<String>,
  pub tokens_used: u32,
  pub model_version: String,
}

/// Per-call metadata (§4.5, §9 acceptance criteria): whether this
/// particular response came from cache, and whether the classifier or
/// selector degraded to a fallback.
fn is_false(value: &bool) -> bool {
  !*value
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct EnhanceMetadata {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cache: Option<&'static str>,
  #[serde(skip_serializing_if = "is_false")]
  pub classifier_fallback: bool,
  #[serde(skip_serializing_if = "is_false")]
  pub selector_fallback: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rerun_from: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnhanceOutcome {
  #[serde(flatten)]
  pub result: EnhanceResult,
  pub metadata: EnhanceMetadata,
}

/// §4.5's `/enhance` pipeline entrypoint. Enforces the overall 30s
/// deadline around the whole sequence; a deadline exceeded between steps
/// surfaces as `Timeout`, per §5's cancellation semantics.
pub async fn enhance(
  state: &AppState,
  owner_id: Option<UserId>,
  request: EnhanceRequest,
) -> Result<EnhanceOutcome, CoreError> {
  match timeout(ORCHESTRATION_DEADLINE, run_pipeline(state, owner_id, request)).await {
    Ok(result) => result,
    Err(_) => Err(CoreError::Timeout(
      "orchestration deadline exceeded".to_string(),
    )),
  }
}

/// §4.5 step 3's fallback: classifier unavailable after retries degrades to
/// a fixed `general`/`moderate` guess rather than failing the request.
fn classifier_fallback_response() -> ClassifyResponse {
  ClassifyResponse {
    intent: "general".to_string(),
    complexity: "moderate".to_string(),
    confidence: 0.0,
    suggested_techniques: default_techniques_for_intent("general"),
  }
}

async fn run_pipeline(
  state: &AppState,
  owner_id: Option<UserId>,
  request: EnhanceRequest,
) -> Result<EnhanceOutcome, CoreError> {
  let started_at = std::time::Instant::now();

  // Step 1: normalize + fingerprint.
  let normalized_text = normalize_text(&request.text);
  let preferences = request.prefer_techniques.clone().unwrap_or_default();
  let fp = fingerprint_hex(
    &normalized_text,
    &preferences,
    request.context.as_ref(),
    request.target_complexity.as_deref(),
  );
  let cache_key = enhancement_key(&fp);

  // Step 2: cache lookup.
  if let Some(cached) = state.cache.get::<EnhanceResult>(&cache_key).await {
    spawn_audit_record(
      state.audit.clone(),
      owner_id,
      Some("hit"),
      started_at.elapsed().as_millis() as i64,
    );
    return Ok(EnhanceOutcome {
      result: cached,
      metadata: EnhanceMetadata {
        cache: Some("hit"),
        ..Default::default()
      },
    });
  }

  // Step 3: classify, consulting the intent cache first since the
  // classifier is keyed purely on text and is the most expensive
  // collaborator round-trip to skip.
  let intent_cache_key = intent_key(&fingerprint_hex(&normalized_text, &[], None, None));
  let (classification, classifier_fallback) =
    if let Some(cached) = state.cache.get::<ClassifyResponse>(&intent_cache_key).await {
      (cached, false)
    } else {
      let (classification, classifier_fallback) =
        match state.classifier.classify(&normalized_text).await {
          Ok(response) => (response, false),
          Err(err) => {
            warn!(error = ?err, "classifier unavailable, falling back");
            (classifier_fallback_response(), true)
          }
        };
      if !classifier_fallback {
        state
          .cache
          .set(&intent_cache_key, &classification, ttl::INTENT_RESULT_SECS)
          .await;
      }
      (classification, classifier_fallback)
    };

  // Step 4: complexity normalization; an explicit target overrides the
  // classifier's value after normalization.
  let classifier_complexity = complexity::normalize(&classification.complexity);
  let effective_complexity = request
    .target_complexity
    .as_deref()
    .map(complexity::normalize)
    .unwrap_or(classifier_complexity);

  // Step 5: select techniques, falling back through the pure chain on
  // selector failure.
  let selector_outcome = state
    .selector
    .select(SelectRequest {
      text: normalized_text.clone(),
      intent: classification.intent.clone(),
      complexity: effective_complexity.to_string(),
      prefer_techniques: request.prefer_techniques.clone(),
    })
    .await;
  let selector_fallback = selector_outcome.is_err();
  if let Err(ref err) = selector_outcome {
    warn!(error = ?err, "selector unavailable, falling back to classifier suggestions");
  }
  let selector_result = selector_outcome.ok();

  let chosen_techniques = techniques::fallback_chain(
    selector_result.as_ref().map(|r| r.techniques.as_slice()),
    &classification.suggested_techniques,
  );

  // Step 6: generate. Any failure here is fatal.
  let generated = state
    .generator
    .generate(GenerateRequest {
      text: normalized_text,
      intent: classification.intent.clone(),
      complexity: effective_complexity.to_string(),
      techniques: chosen_techniques.clone(),
      context: request.context.clone().unwrap_or(Value::Null),
    })
    .await
    .map_err(|err| {
      warn!(error = ?err, "generator call failed, returning GenerationFailed");
      CoreError::GenerationFailed
    })?;

  let result = EnhanceResult {
    enhanced_text: generated.enhanced_text,
    intent: classification.intent,
    complexity: effective_complexity.to_string(),
    techniques: chosen_techniques,
    tokens_used: generated.tokens_used,
    model_version: generated.model_version,
  };

  // Step 7: persist history off the critical path; anonymous requests
  // skip persistence entirely.
  if let Some(owner_id) = owner_id {
    spawn_history_persist(
      state.history.clone(),
      state.cache.clone(),
      owner_id,
      request.text,
      result.clone(),
      None,
    );
  }

  // Step 8: cache the result and return.
  state
    .cache
    .set(&cache_key, &result, ttl::ENHANCEMENT_RESULT_SECS)
    .await;
  spawn_audit_record(
    state.audit.clone(),
    owner_id,
    Some("miss"),
    started_at.elapsed().as_millis() as i64,
  );

  Ok(EnhanceOutcome {
    result,
    metadata: EnhanceMetadata {
      cache: Some("miss"),
      classifier_fallback,
      selector_fallback,
      rerun_from: None,
    },
  })
}

fn complexity_enum(label: &str) -> Complexity {
  match label {
    "simple" => Complexity::Simple,
    "complex" => Complexity::Complex,
    _ => Complexity::Moderate,
  }
}

/// Fire-and-forget persistence with bounded retry (§4.5 step 7): at most 3
/// attempts over a 10s budget, running under its own detached task so a
/// slow write never holds up the response already handed back to the
/// caller.
fn spawn_history_persist(
  history: impl HistoryRepository + Clone + 'static,
  cache: RedisCacheService,
  owner_id: UserId,
  original_prompt: String,
  result: EnhanceResult,
  rerun_from: Option<String>,
) {
  tokio::spawn(async move {
    let deadline = tokio::time::Instant::now() + HISTORY_PERSIST_BUDGET;
    let metadata = match &rerun_from {
      Some(id) => serde_json::json!({ "rerun_from": id }),
      None => Value::Object(Default::default()),
    };

    for attempt in 0..HISTORY_PERSIST_MAX_ATTEMPTS {
      if tokio::time::Instant::now() >= deadline {
        warn!("history persistence budget exhausted, giving up");
        return;
      }

      let outcome = history
        .append(
          owner_id,
          &original_prompt,
          &result.enhanced_text,
          &result.intent,
          complexity_enum(&result.complexity),
          &result.techniques,
          metadata.clone(),
        )
        .await;

      match outcome {
        Ok(_) => {
          cache
            .invalidate_by_prefix(&format!("history:v1:user:{}:list:", owner_id))
            .await;
          return;
        }
        Err(err) if attempt + 1 < HISTORY_PERSIST_MAX_ATTEMPTS => {
          warn!(error = ?err, attempt, "history persist failed, retrying");
        }
        Err(err) => {
          error!(error = ?err, "history persist failed permanently");
        }
      }
    }
  });
}

/// Fire-and-forget audit row for one completed `/enhance` call (§12/§13).
/// Anonymous requests still get a row with `user_id = NULL`; a write
/// failure is logged and otherwise ignored, never surfaced to the caller.
fn spawn_audit_record(
  audit: PgApiUsageRepository,
  owner_id: Option<UserId>,
  cache: Option<&'static str>,
  latency_ms: i64,
) {
  tokio::spawn(async move {
    if let Err(err) = audit
      .record_enhance_completion(owner_id, latency_ms, cache)
      .await
    {
      warn!(error = ?err, "failed to write api_usage audit row");
    }
  });
}

/// §4.6 `Rerun`: re-executes the pipeline with the stored original text but
/// fresh classification/selection, and tags the resulting record with
/// `rerun_from`.
pub async fn rerun(
  state: &AppState,
  owner_id: UserId,
  original_prompt: String,
  rerun_from: String,
) -> Result<EnhanceOutcome, CoreError> {
  let started_at = std::time::Instant::now();

  // Rerun intentionally bypasses the result cache (a rerun is requested
  // precisely because the caller wants a fresh generation) but still goes
  // through the normal pipeline for classification/selection/generation.
  let normalized_text = normalize_text(&original_prompt);

  let intent_cache_key = intent_key(&fingerprint_hex(&normalized_text, &[], None, None));
  let (classification, classifier_fallback) =
    if let Some(cached) = state.cache.get::<ClassifyResponse>(&intent_cache_key).await {
      (cached, false)
    } else {
      let (classification, classifier_fallback) =
        match state.classifier.classify(&normalized_text).await {
          Ok(response) => (response, false),
          Err(err) => {
            warn!(error = ?err, "classifier unavailable during rerun, falling back");
            (classifier_fallback_response(), true)
          }
        };
      if !classifier_fallback {
        state
          .cache
          .set(&intent_cache_key, &classification, ttl::INTENT_RESULT_SECS)
          .await;
      }
      (classification, classifier_fallback)
    };
  let effective_complexity = complexity::normalize(&classification.complexity);

  let selector_outcome = state
    .selector
    .select(SelectRequest {
      text: normalized_text.clone(),
      intent: classification.intent.clone(),
      complexity: effective_complexity.to_string(),
      prefer_techniques: None,
    })
    .await;
  let selector_fallback = selector_outcome.is_err();
  let selector_result = selector_outcome.ok();

  let chosen_techniques = techniques::fallback_chain(
    selector_result.as_ref().map(|r| r.techniques.as_slice()),
    &classification.suggested_techniques,
  );

  let generated = state
    .generator
    .generate(GenerateRequest {
      text: normalized_text,
      intent: classification.intent.clone(),
      complexity: effective_complexity.to_string(),
      techniques: chosen_techniques.clone(),
      context: Value::Null,
    })
    .await
    .map_err(|_| CoreError::GenerationFailed)?;

  let result = EnhanceResult {
    enhanced_text: generated.enhanced_text,
    intent: classification.intent,
    complexity: effective_complexity.to_string(),
    techniques: chosen_techniques,
    tokens_used: generated.tokens_used,
    model_version: generated.model_version,
  };

  spawn_history_persist(
    state.history.clone(),
    state.cache.clone(),
    owner_id,
    original_prompt,
    result.clone(),
    Some(rerun_from.clone()),
  );
  spawn_audit_record(
    state.audit.clone(),
    Some(owner_id),
    None,
    started_at.elapsed().as_millis() as i64,
  );

  Ok(EnhanceOutcome {
    result,
    metadata: EnhanceMetadata {
      cache: None,
      classifier_fallback,
      selector_fallback,
      rerun_from: Some(rerun_from),
    },
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifier_fallback_uses_general_intent() {
    let response = classifier_fallback_response();
    assert_eq!(response.intent, "general");
    assert_eq!(response.complexity, "moderate");
    assert_eq!(response.confidence, 0.0);
  }
}
