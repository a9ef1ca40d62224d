//! Signed bearer tokens: claim shapes, encode/decode, and the opaque
//! refresh-token helpers used by the session layer.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::ids::UserId;

pub const JWT_ISSUER: &str = "promptforge";
pub const JWT_AUDIENCE: &str = "promptforge-api";
pub const JWT_LEEWAY_SECS: u64 = 60;

/// Default access-token lifetime (§3): 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Access-token lifetime when the caller requests "remember me" at login.
pub const REMEMBER_ME_ACCESS_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;
/// Refresh-token lifetime (§3).
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  User,
  Developer,
  Admin,
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Role::User => "user",
      Role::Developer => "developer",
      Role::Admin => "admin",
    };
    write!(f, "{s}")
  }
}

/// The signed claim set carried in an access token (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub: String,
  pub roles: Vec<Role>,
  pub permissions: Vec<String>,
  #[serde(rename = "type")]
  pub token_type: TokenType,
  pub iat: i64,
  pub exp: i64,
  pub iss: String,
  pub aud: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
  Access,
}

/// The validated caller identity a handler actually wants: `{userId, roles,
/// permissions}` (§4.2 `Validate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
  pub user_id: UserId,
  pub roles: Vec<Role>,
  pub permissions: Vec<String>,
}

impl Principal {
  pub fn has_role(&self, role: Role) -> bool {
    self.roles.contains(&role)
  }
}

/// A new access/refresh pair returned by Register/Login/Refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
  pub access_token: String,
  pub refresh_token: String,
  pub access_expires_at: DateTime<Utc>,
  pub refresh_expires_at: DateTime<Utc>,
}

/// Encodes and verifies access tokens. Holds no database connection —
/// refresh-token persistence is the session repository's job.
#[derive(Clone)]
pub struct TokenManager {
  encoding_key: EncodingKey,
  decoding_key: DecodingKey,
  validation: Validation,
}

impl TokenManager {
  pub fn new(secret: &str) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[JWT_ISSUER]);
    validation.set_audience(&[JWT_AUDIENCE]);
    validation.leeway = JWT_LEEWAY_SECS;

    Self {
      encoding_key: EncodingKey::from_secret(secret.as_bytes()),
      decoding_key: DecodingKey::from_secret(secret.as_bytes()),
      validation,
    }
  }

  pub fn generate_access_token(
    &self,
    user_id: UserId,
    roles: Vec<Role>,
    permissions: Vec<String>,
    remember_me: bool,
  ) -> Result<(String, DateTime<Utc>), CoreError> {
    let ttl_secs = if remember_me {
      REMEMBER_ME_ACCESS_TOKEN_TTL_SECS
    } else {
      ACCESS_TOKEN_TTL_SECS
    };
    let now = Utc::now();
    let exp = now + chrono::Duration::seconds(ttl_secs);

    let claims = Claims {
      sub: user_id.to_string(),
      roles,
      permissions,
      token_type: TokenType::Access,
      iat: now.timestamp(),
      exp: exp.timestamp(),
      iss: JWT_ISSUER.to_string(),
      aud: JWT_AUDIENCE.to_string(),
    };

    let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
      .map_err(CoreError::from)?;
    Ok((token, exp))
  }

  pub fn verify_access_token(&self, token: &str) -> Result<Principal, CoreError> {
    if token.is_empty() {
      return Err(CoreError::InvalidInput("empty token".into()));
    }
    if token.split('.').count() != 3 {
      return Err(CoreError::Unauthenticated);
    }

    let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
    let user_id: UserId = data
      .claims
      .sub
      .parse()
      .map_err(|_| CoreError::Unauthenticated)?;

    Ok(Principal {
      user_id,
      roles: data.claims.roles,
      permissions: data.claims.permissions,
    })
  }
}

/// `TokenManager` trait that can be mocked for testing (§11.4): callers that
/// only need to issue/verify tokens depend on this instead of the concrete
/// type, so unit tests can substitute `MockTokenManagerTrait`.
#[cfg_attr(test, mockall::automock)]
pub trait TokenManagerTrait {
  fn generate_access_token(
    &self,
    user_id: UserId,
    roles: Vec<Role>,
    permissions: Vec<String>,
    remember_me: bool,
  ) -> Result<(String, DateTime<Utc>), CoreError>;

  fn verify_access_token(&self, token: &str) -> Result<Principal, CoreError>;
}

impl TokenManagerTrait for TokenManager {
  fn generate_access_token(
    &self,
    user_id: UserId,
    roles: Vec<Role>,
    permissions: Vec<String>,
    remember_me: bool,
  ) -> Result<(String, DateTime<Utc>), CoreError> {
    TokenManager::generate_access_token(self, user_id, roles, permissions, remember_me)
  }

  fn verify_access_token(&self, token: &str) -> Result<Principal, CoreError> {
    TokenManager::verify_access_token(self, token)
  }
}

/// Generates a new opaque refresh token: 32 random bytes, hex-encoded. Never
/// decodable — only ever compared against its stored hash.
pub fn generate_refresh_token() -> String {
  let mut bytes = [0u8; 32];
  rand::thread_rng().fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// SHA-256 hash of a refresh token, for at-rest storage (the session table
/// stores the hash, never the raw token).
pub fn hash_refresh_token(token: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(token.as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn manager() -> TokenManager {
    TokenManager::new("test-secret-at-least-this-long")
  }

  #[test]
  fn round_trips_access_token() {
    let tm = manager();
    let user_id = UserId::new();
    let (token, _exp) = tm
      .generate_access_token(user_id, vec![Role::User], vec!["enhance".into()], false)
      .unwrap();

    let principal = tm.verify_access_token(&token).unwrap();
    assert_eq!(principal.user_id, user_id);
    assert!(principal.has_role(Role::User));
  }

  #[test]
  fn rejects_malformed_token() {
    let tm = manager();
    assert!(matches!(
      tm.verify_access_token("not-a-jwt"),
      Err(CoreError::Unauthenticated)
    ));
  }

  #[test]
  fn rejects_empty_token() {
    let tm = manager();
    assert!(matches!(
      tm.verify_access_token(""),
      Err(CoreError::InvalidInput(_))
    ));
  }

  #[test]
  fn rejects_token_signed_with_different_secret() {
    let tm_a = TokenManager::new("secret-a-padding-padding");
    let tm_b = TokenManager::new("secret-b-padding-padding");
    let (token, _) = tm_a
      .generate_access_token(UserId::new(), vec![Role::User], vec![], false)
      .unwrap();
    assert!(tm_b.verify_access_token(&token).is_err());
  }

  #[test]
  fn mock_token_manager_trait_substitutes_for_real_calls() {
    let mut mock = MockTokenManagerTrait::new();
    let user_id = UserId::new();
    mock
      .expect_verify_access_token()
      .withf(|token| token == "fake-token")
      .returning(move |_| {
        Ok(Principal {
          user_id,
          roles: vec![Role::User],
          permissions: vec![],
        })
      });

    let principal = mock.verify_access_token("fake-token").unwrap();
    assert_eq!(principal.user_id, user_id);
  }

  #[test]
  fn refresh_token_hash_is_deterministic() {
    let token = generate_refresh_token();
    assert_eq!(hash_refresh_token(&token), hash_refresh_token(&token));
    assert_ne!(token, hash_refresh_token(&token));
  }

  #[test]
  fn refresh_tokens_are_unique() {
    let a = generate_refresh_token();
    let b = generate_refresh_token();
    assert_ne!(a, b);
  }
}
