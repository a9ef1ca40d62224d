use serde_json::Value;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Computes the deterministic 32-byte SHA-256 fingerprint of a request
/// (§4.1). Text is NFC-normalized and whitespace-collapsed; preferences are
/// sorted lexicographically; context is canonicalized (keys sorted,
/// null-valued keys dropped); the hash input is length-prefixed to prevent
/// boundary confusion between fields.
pub fn fingerprint(
  text: &str,
  preferences: &[String],
  context: Option<&Value>,
  target_complexity: Option<&str>,
) -> [u8; 32] {
  let normalized_text = normalize_text(text);

  let mut sorted_prefs = preferences.to_vec();
  sorted_prefs.sort();

  let canonical_context = context
    .map(canonicalize_context)
    .unwrap_or_else(|| "{}".to_string());

  let mut hasher = Sha256::new();
  write_length_prefixed(&mut hasher, normalized_text.as_bytes());
  write_length_prefixed(&mut hasher, sorted_prefs.join(",").as_bytes());
  write_length_prefixed(&mut hasher, canonical_context.as_bytes());
  write_length_prefixed(&mut hasher, target_complexity.unwrap_or("").as_bytes());

  hasher.finalize().into()
}

pub fn fingerprint_hex(
  text: &str,
  preferences: &[String],
  context: Option<&Value>,
  target_complexity: Option<&str>,
) -> String {
  hex::encode(fingerprint(text, preferences, context, target_complexity))
}

pub fn normalize_text(text: &str) -> String {
  let nfc: String = text.nfc().collect();
  nfc.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sorts object keys recursively and drops null-valued keys, so that two
/// semantically-identical context payloads with different key order or
/// optional-null padding hash identically.
fn canonicalize_context(value: &Value) -> String {
  serde_json::to_string(&canonicalize_value(value)).unwrap_or_else(|_| "{}".to_string())
}

fn canonicalize_value(value: &Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(&String, &Value)> =
        map.iter().filter(|(_, v)| !v.is_null()).collect();
      entries.sort_by(|a, b| a.0.cmp(b.0));
      let mut canonical = serde_json::Map::new();
      for (k, v) in entries {
        canonical.insert(k.clone(), canonicalize_value(v));
      }
      Value::Object(canonical)
    }
    Value::Array(items) => Value::Array(items.iter().map(canonicalize_value).collect()),
    other => other.clone(),
  }
}

fn write_length_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
  hasher.update((bytes.len() as u64).to_be_bytes());
  hasher.update(bytes);
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn is_deterministic() {
    let a = fingerprint("Explain quantum computing", &[], None, None);
    let b = fingerprint("Explain quantum computing", &[], None, None);
    assert_eq!(a, b);
  }

  #[test]
  fn whitespace_collapse_does_not_change_fingerprint() {
    let a = fingerprint("Explain   quantum  computing", &[], None, None);
    let b = fingerprint("Explain quantum computing", &[], None, None);
    assert_eq!(a, b);
  }

  #[test]
  fn preference_order_does_not_change_fingerprint() {
    let a = fingerprint("x", &["b".into(), "a".into()], None, None);
    let b = fingerprint("x", &["a".into(), "b".into()], None, None);
    assert_eq!(a, b);
  }

  #[test]
  fn null_context_keys_are_ignored() {
    let with_null = json!({"a": 1, "b": null});
    let without_null = json!({"a": 1});
    let a = fingerprint("x", &[], Some(&with_null), None);
    let b = fingerprint("x", &[], Some(&without_null), None);
    assert_eq!(a, b);
  }

  #[test]
  fn context_key_order_does_not_change_fingerprint() {
    let a = fingerprint("x", &[], Some(&json!({"a": 1, "b": 2})), None);
    let b = fingerprint("x", &[], Some(&json!({"b": 2, "a": 1})), None);
    assert_eq!(a, b);
  }

  #[test]
  fn different_text_yields_different_fingerprint() {
    let a = fingerprint("a", &[], None, None);
    let b = fingerprint("b", &[], None, None);
    assert_ne!(a, b);
  }

  #[test]
  fn boundary_confusion_is_prevented_by_length_prefixing() {
    // Without length-prefixing, ("ab", "c") and ("a", "bc") would collide
    // when naively concatenated.
    let a = fingerprint("ab", &["c".to_string()], None, None);
    let b = fingerprint("a", &["bc".to_string()], None, None);
    assert_ne!(a, b);
  }
}
