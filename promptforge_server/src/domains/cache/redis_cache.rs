use redis::AsyncCommands;
use redis::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// TTL policy (§4.1): intent results 1h, enhancement results 10min,
/// technique catalog 30min, user profile 1min, history list 2min.
pub mod ttl {
  pub const INTENT_RESULT_SECS: u64 = 3600;
  pub const ENHANCEMENT_RESULT_SECS: u64 = 600;
  pub const TECHNIQUE_CATALOG_SECS: u64 = 1800;
  pub const USER_PROFILE_SECS: u64 = 60;
  pub const HISTORY_LIST_SECS: u64 = 120;
}

/// Redis-backed implementation of the fingerprint cache (§4.1). Every
/// operation fails **open**: a backend error is logged and treated as a
/// miss (reads) or a silent no-op (writes) — cache errors never propagate
/// to the caller (§4.1, §7's `CacheUnavailable`).
#[derive(Clone)]
pub struct RedisCacheService {
  client: Client,
  prefix: String,
}

impl RedisCacheService {
  pub fn new(client: Client, prefix: String) -> Self {
    Self { client, prefix }
  }

  fn make_key(&self, key: &str) -> String {
    format!("{}:{}", self.prefix, key)
  }

  /// Readiness probe (§6's `/health/ready`): a real round-trip, not just a
  /// successful connection handshake.
  pub async fn ping(&self) -> redis::RedisResult<()> {
    let mut conn = self.client.get_multiplexed_async_connection().await?;
    redis::cmd("PING").query_async(&mut conn).await
  }

  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let mut conn = match self.client.get_multiplexed_async_connection().await {
      Ok(conn) => conn,
      Err(err) => {
        warn!(error = %err, "cache unavailable on get, failing open");
        return None;
      }
    };

    let raw: Option<String> = match conn.get(self.make_key(key)).await {
      Ok(v) => v,
      Err(err) => {
        warn!(error = %err, "cache get failed, failing open");
        metrics::counter!("cache_miss_total", "kind" => "error").increment(1);
        return None;
      }
    };

    match raw {
      Some(s) => match serde_json::from_str(&s) {
        Ok(value) => {
          metrics::counter!("cache_hit_total", "kind" => "redis").increment(1);
          Some(value)
        }
        Err(err) => {
          warn!(error = %err, "cache value failed to decode, treating as miss");
          None
        }
      },
      None => {
        metrics::counter!("cache_miss_total", "kind" => "redis").increment(1);
        None
      }
    }
  }

  pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl_secs: u64) {
    let Ok(serialized) = serde_json::to_string(value) else {
      warn!("cache value failed to serialize, dropping write");
      return;
    };

    let mut conn = match self.client.get_multiplexed_async_connection().await {
      Ok(conn) => conn,
      Err(err) => {
        warn!(error = %err, "cache unavailable on set, dropping write");
        return;
      }
    };

    let key = self.make_key(key);
    if let Err(err) = conn
      .set_ex::<_, _, ()>(key, serialized, ttl_secs)
      .await
    {
      warn!(error = %err, "cache set failed, dropping write");
    }
  }

  /// Prefix invalidation (§3's `CacheEntry` invariant: "a mutation to
  /// history invalidates any owner-scoped list entries under a well-known
  /// prefix"). SCAN-based so it never blocks Redis with a long KEYS scan.
  pub async fn invalidate_by_prefix(&self, prefix: &str) {
    let mut conn = match self.client.get_multiplexed_async_connection().await {
      Ok(conn) => conn,
      Err(err) => {
        warn!(error = %err, "cache unavailable on invalidate, skipping");
        return;
      }
    };

    let pattern = format!("{}*", self.make_key(prefix));
    let mut cursor = 0u64;
    loop {
      let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
        .arg(cursor)
        .arg("MATCH")
        .arg(&pattern)
        .arg("COUNT")
        .arg(200)
        .query_async(&mut conn)
        .await
      {
        Ok(result) => result,
        Err(err) => {
          warn!(error = %err, "cache scan failed during invalidation");
          return;
        }
      };

      if !keys.is_empty() {
        let _: Result<(), _> = conn.del(&keys).await;
      }

      cursor = next_cursor;
      if cursor == 0 {
        break;
      }
    }
  }
}
