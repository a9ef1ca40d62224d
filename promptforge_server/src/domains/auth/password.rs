use promptforge_core::CoreError;

const BCRYPT_COST: u32 = 11;

/// A fixed dummy hash compared against when the user does not exist, so
/// `Login` takes comparable wall time whether the failure is "no such
/// user" or "wrong password" (§4.2's timing requirement).
const DUMMY_HASH: &str = "$2b$11$CwTycUXWue0Thq9StjUM0uJ8l5VOgV8z1r6h6s2QJ5M8c7jYfQeQO";

pub fn hash_password(password: &str) -> Result<String, CoreError> {
  bcrypt::hash(password, BCRYPT_COST).map_err(|e| CoreError::Internal(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, CoreError> {
  bcrypt::verify(password, hash).map_err(|e| CoreError::Internal(e.to_string()))
}

/// Runs a compare against a fixed dummy hash, discarding the result. Call
/// this on the "user not found" path so the branch costs roughly the same
/// as a real `verify_password` call.
pub fn verify_dummy(password: &str) {
  let _ = bcrypt::verify(password, DUMMY_HASH);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify_round_trips() {
    let hash = hash_password("Str0ngPassw0rd!").unwrap();
    assert!(verify_password("Str0ngPassw0rd!", &hash).unwrap());
    assert!(!verify_password("wrong", &hash).unwrap());
  }

  #[test]
  fn same_password_yields_different_hashes() {
    let a = hash_password("Str0ngPassw0rd!").unwrap();
    let b = hash_password("Str0ngPassw0rd!").unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn dummy_hash_is_a_valid_bcrypt_hash() {
    assert!(bcrypt::verify("anything", DUMMY_HASH).is_ok());
  }
}
