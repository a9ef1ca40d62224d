use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
  8080
}
fn default_environment() -> String {
  "development".into()
}
fn default_log_level() -> String {
  "info".into()
}
fn default_access_ttl() -> i64 {
  15 * 60
}
fn default_refresh_ttl() -> i64 {
  7 * 24 * 60 * 60
}
fn default_rate_rpm() -> u32 {
  60
}
fn default_rate_burst() -> u32 {
  20
}
fn default_request_timeout_ms() -> u64 {
  30_000
}
fn default_circuit_breaker_threshold() -> u64 {
  5
}
fn default_circuit_breaker_recovery_secs() -> u64 {
  60
}

/// Top-level application configuration (§6's Configuration table). Loaded
/// from a YAML file with environment variables overriding the secret
/// fields, per SPEC_FULL §11.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
  #[serde(default = "default_port")]
  pub port: u16,
  #[serde(default = "default_environment")]
  pub environment: String,
  #[serde(default = "default_log_level")]
  pub log_level: String,

  pub database_url: String,
  pub cache_url: String,

  pub jwt_access_secret: String,
  pub jwt_refresh_secret: String,
  #[serde(default = "default_access_ttl")]
  pub access_ttl: i64,
  #[serde(default = "default_refresh_ttl")]
  pub refresh_ttl: i64,

  pub collaborators: CollaboratorUrls,

  #[serde(default = "default_rate_rpm")]
  pub rate_rpm: u32,
  #[serde(default = "default_rate_burst")]
  pub rate_burst: u32,

  #[serde(default)]
  pub cors_allowed_origins: Vec<String>,
  #[serde(default)]
  pub production_origin: Option<String>,

  #[serde(default)]
  pub enable_docs: bool,
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,

  #[serde(default = "default_circuit_breaker_threshold")]
  pub circuit_breaker_threshold: u64,
  #[serde(default = "default_circuit_breaker_recovery_secs")]
  pub circuit_breaker_recovery: u64,

  /// Dev-mode bypass (§4.2): `X-Test-Mode: true` is honored only when this
  /// flag is also set. Must never be true outside local/dev deployments.
  #[serde(default)]
  pub allow_test_mode_bypass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorUrls {
  pub classifier_url: String,
  pub selector_url: String,
  pub generator_url: String,
}

impl AppConfig {
  /// Resolution order: `PROMPTFORGE_CONFIG` env var if set, else
  /// `./config/promptforge.yml`, else `./promptforge.yml`. Environment
  /// variables always override the secret fields, regardless of which file
  /// was loaded (SPEC_FULL §11.3 — deliberately simpler than the teacher's
  /// multi-location Docker search).
  pub fn load() -> Result<Self> {
    let path = Self::resolve_path();
    let contents = fs::read_to_string(&path)
      .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let mut config: AppConfig =
      serde_yaml::from_str(&contents).context("failed to parse config file as YAML")?;
    config.apply_env_overrides();
    Ok(config)
  }

  fn resolve_path() -> PathBuf {
    if let Ok(path) = env::var("PROMPTFORGE_CONFIG") {
      return PathBuf::from(path);
    }
    let docker_path = Path::new("./config/promptforge.yml");
    if docker_path.exists() {
      return docker_path.to_path_buf();
    }
    PathBuf::from("./promptforge.yml")
  }

  fn apply_env_overrides(&mut self) {
    if let Ok(v) = env::var("DATABASE_URL") {
      self.database_url = v;
    }
    if let Ok(v) = env::var("CACHE_URL") {
      self.cache_url = v;
    }
    if let Ok(v) = env::var("JWT_ACCESS_SECRET") {
      self.jwt_access_secret = v;
    }
    if let Ok(v) = env::var("JWT_REFRESH_SECRET") {
      self.jwt_refresh_secret = v;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_minimal_yaml_with_defaults() {
    let yaml = r#"
database_url: "postgres://localhost/promptforge"
cache_url: "redis://localhost"
jwt_access_secret: "access-secret"
jwt_refresh_secret: "refresh-secret"
collaborators:
  classifier_url: "http://classifier"
  selector_url: "http://selector"
  generator_url: "http://generator"
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.access_ttl, 15 * 60);
    assert!(!config.enable_docs);
  }

  #[test]
  fn env_override_replaces_secret() {
    let yaml = r#"
database_url: "postgres://localhost/promptforge"
cache_url: "redis://localhost"
jwt_access_secret: "from-file"
jwt_refresh_secret: "from-file"
collaborators:
  classifier_url: "http://classifier"
  selector_url: "http://selector"
  generator_url: "http://generator"
"#;
    let mut config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    unsafe {
      env::set_var("JWT_ACCESS_SECRET", "from-env");
    }
    config.apply_env_overrides();
    unsafe {
      env::remove_var("JWT_ACCESS_SECRET");
    }
    assert_eq!(config.jwt_access_secret, "from-env");
  }
}
