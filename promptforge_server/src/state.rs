use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use promptforge_collab::{ClassifierClient, GeneratorClient, SelectorClient};
use promptforge_core::{CoreError, Principal, TokenManager, TokenVerifier, WithTokenManager};
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::domains::audit::PgApiUsageRepository;
use crate::domains::auth::repository::{PgSessionRepository, PgUserRepository};
use crate::domains::cache::redis_cache::RedisCacheService;
use crate::domains::history::repository::PgHistoryRepository;
use crate::domains::rate_limit::RateGovernor;

pub struct AppStateInner {
  pub config: AppConfig,
  pub db: PgPool,
  pub token_manager: TokenManager,
  pub cache: RedisCacheService,
  pub rate_governor: RateGovernor,
  pub users: PgUserRepository,
  pub sessions: PgSessionRepository,
  pub history: PgHistoryRepository,
  pub audit: PgApiUsageRepository,
  pub classifier: ClassifierClient,
  pub selector: SelectorClient,
  pub generator: GeneratorClient,
  pub metrics_handle: PrometheusHandle,
}

/// `Arc<AppStateInner>` + `Deref`, mirroring the teacher's `AppState`
/// shape — cheap to clone into every handler/middleware, single source of
/// truth for process-wide resources (§5: "the database connection pool and
/// the cache connection pool are process-wide").
#[derive(Clone)]
pub struct AppState {
  inner: Arc<AppStateInner>,
}

impl std::ops::Deref for AppState {
  type Target = AppStateInner;

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl AppState {
  pub fn new(
    config: AppConfig,
    db: PgPool,
    redis: RedisClient,
    metrics_handle: PrometheusHandle,
  ) -> Self {
    let token_manager = TokenManager::new(&config.jwt_access_secret);
    let request_timeout = Duration::from_millis(config.request_timeout_ms);

    let inner = AppStateInner {
      cache: RedisCacheService::new(redis.clone(), "promptforge".to_string()),
      rate_governor: RateGovernor::new(config.rate_rpm, config.rate_burst),
      users: PgUserRepository::new(db.clone()),
      sessions: PgSessionRepository::new(db.clone()),
      history: PgHistoryRepository::new(db.clone()),
      audit: PgApiUsageRepository::new(db.clone()),
      classifier: ClassifierClient::new(
        config.collaborators.classifier_url.clone(),
        request_timeout,
      ),
      selector: SelectorClient::new(config.collaborators.selector_url.clone(), request_timeout),
      generator: GeneratorClient::new(
        config.collaborators.generator_url.clone(),
        request_timeout,
      ),
      metrics_handle,
      token_manager,
      config,
      db,
    };

    Self {
      inner: Arc::new(inner),
    }
  }
}

impl WithTokenManager for AppState {
  fn token_manager(&self) -> &TokenManager {
    &self.inner.token_manager
  }
}

impl TokenVerifier for AppState {
  type Claims = Principal;
  type Error = CoreError;

  fn verify_token(&self, token: &str) -> Result<Principal, CoreError> {
    self.inner.token_manager.verify_access_token(token)
  }
}

/// Test-only constructor gated behind the `test-util` feature (§11.4),
/// mirroring the teacher's own `AppState::test_new` — spins up a throwaway
/// Postgres database via `sqlx-db-tester`, runs the embedded migrations
/// against it, and wires a real `AppState` so integration tests can drive
/// the router with `tower::ServiceExt::oneshot` instead of mocking their
/// way through the handler layer.
#[cfg(any(test, feature = "test-util"))]
impl AppState {
  pub async fn test_new() -> anyhow::Result<(sqlx_db_tester::TestPg, Self)> {
    let config = AppConfig::load()?;

    let post = config
      .database_url
      .rfind('/')
      .ok_or_else(|| anyhow::anyhow!("invalid database_url: no trailing path segment"))?;
    let server_url = config.database_url[..post].to_string();
    let tdb = sqlx_db_tester::TestPg::new(server_url, std::path::Path::new("./migrations"));
    let db = tdb.get_pool().await;

    let redis = RedisClient::open(config.cache_url.clone())?;
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle();

    Ok((tdb, Self::new(config, db, redis, metrics_handle)))
  }
}
