pub mod fingerprint;
pub mod redis_cache;

pub use fingerprint::{fingerprint, fingerprint_hex, normalize_text};
pub use redis_cache::{ttl, RedisCacheService};

/// Cache key grammar (§4.1): `<domain>:<version>:<qualifier>`. Keeping the
/// version segment lets a schema change invalidate old entries just by
/// bumping a literal rather than flushing the whole keyspace.
pub fn enhancement_key(fingerprint_hex: &str) -> String {
  format!("enhance:v2:result:{}", fingerprint_hex)
}

pub fn intent_key(fingerprint_hex: &str) -> String {
  format!("intent:v1:{}", fingerprint_hex)
}

pub fn history_list_key(owner_id: &str, query_hash: &str) -> String {
  format!("history:v1:user:{}:list:{}", owner_id, query_hash)
}

pub fn technique_catalog_key() -> &'static str {
  "technique:v1:catalog"
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_are_namespaced_and_stable() {
    assert_eq!(enhancement_key("abc"), "enhance:v2:result:abc");
    assert_eq!(intent_key("abc"), "intent:v1:abc");
    assert_eq!(
      history_list_key("user1", "q1"),
      "history:v1:user:user1:list:q1"
    );
    assert_eq!(technique_catalog_key(), "technique:v1:catalog");
  }
}
