use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use promptforge_server::config::AppConfig;
use promptforge_server::state::AppState;
use redis::Client as RedisClient;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = AppConfig::load().context("failed to load configuration")?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
    .json()
    .init();

  let db = PgPoolOptions::new()
    .max_connections(20)
    .connect(&config.database_url)
    .await
    .context("failed to connect to the database")?;

  sqlx::migrate!("./migrations")
    .run(&db)
    .await
    .context("failed to run database migrations")?;

  let redis = RedisClient::open(config.cache_url.clone()).context("failed to build redis client")?;

  let prometheus_handle = PrometheusBuilder::new()
    .install_recorder()
    .context("failed to install the prometheus recorder")?;

  let port = config.port;
  let state = AppState::new(config, db, redis, prometheus_handle);
  let app = promptforge_server::build_router(state);

  let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
    .await
    .with_context(|| format!("failed to bind port {port}"))?;

  tracing::info!(port, "promptforge gateway listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    signal::ctrl_c()
      .await
      .expect("failed to install Ctrl+C handler");
  };

  #[cfg(unix)]
  let terminate = async {
    signal::unix::signal(signal::unix::SignalKind::terminate())
      .expect("failed to install SIGTERM handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  tracing::info!("shutdown signal received, draining connections");
}
