//! Small shared shapes used at the boundary between the auth layer and the
//! rest of the gateway — kept here because both `promptforge_server`'s
//! domain code and its middleware need them without depending on each other.

/// Context captured at login/refresh time and compared against the context
/// presented on a later refresh, to catch session hijacking (§4.2's
/// "security context check").
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
  pub user_agent: Option<String>,
  pub ip_address: Option<String>,
}

impl AuthContext {
  pub fn new(user_agent: Option<String>, ip_address: Option<String>) -> Self {
    Self {
      user_agent,
      ip_address,
    }
  }

  /// A coarse hijack signal: the user agent recorded at issuance no longer
  /// matches. IP address is informational only — NATs and mobile networks
  /// rotate addresses far too often to gate on.
  pub fn user_agent_changed(&self, issued_user_agent: Option<&str>) -> bool {
    match (self.user_agent.as_deref(), issued_user_agent) {
      (Some(now), Some(then)) => now != then,
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_user_agent_change() {
    let ctx = AuthContext::new(Some("curl/8.0".into()), Some("127.0.0.1".into()));
    assert!(ctx.user_agent_changed(Some("Mozilla/5.0")));
    assert!(!ctx.user_agent_changed(Some("curl/8.0")));
  }

  #[test]
  fn missing_user_agent_is_not_a_mismatch() {
    let ctx = AuthContext::new(None, None);
    assert!(!ctx.user_agent_changed(Some("Mozilla/5.0")));
  }
}
