use crate::jwt::TokenManager;

/// Implemented by the server crate's `AppState` so that generic middleware
/// (bearer auth, dev-mode bypass) can reach the token manager without
/// depending on the concrete state struct.
pub trait WithTokenManager {
  fn token_manager(&self) -> &TokenManager;
}
