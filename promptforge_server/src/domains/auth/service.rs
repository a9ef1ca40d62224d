use chrono::{Duration, Utc};
use promptforge_core::{AuthContext, AuthTokens, CoreError, Principal, Role, TokenManager};

use super::password;
use super::repository::{SessionRepository, UserRepository};
use crate::domains::audit::PgApiUsageRepository;
use crate::models::UserRow;

const MAX_LOGIN_FAILURES: i32 = 5;
const LOGIN_FAILURE_WINDOW: Duration = Duration::minutes(15);
const LOCKOUT_DURATION: Duration = Duration::minutes(30);

fn roles_for(row: &UserRow) -> Vec<Role> {
  row
    .roles
    .iter()
    .filter_map(|r| match r.as_str() {
      "user" => Some(Role::User),
      "developer" => Some(Role::Developer),
      "admin" => Some(Role::Admin),
      _ => None,
    })
    .collect()
}

fn is_weak_password(password: &str) -> bool {
  if password.len() < 8 {
    return true;
  }
  let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
  let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
  let has_digit = password.chars().any(|c| c.is_ascii_digit());
  !(has_upper && has_lower && has_digit)
}

const RESERVED_USERNAMES: &[&str] = &["admin", "root", "system", "promptforge", "support"];

fn is_reserved_username(username: &str) -> bool {
  RESERVED_USERNAMES.contains(&username.to_ascii_lowercase().as_str())
}

async fn issue_tokens(
  token_manager: &TokenManager,
  sessions: &impl SessionRepository,
  user: &UserRow,
  remember_me: bool,
  auth_context: &AuthContext,
) -> Result<AuthTokens, CoreError> {
  let (access_token, access_expires_at) = token_manager.generate_access_token(
    user.id,
    roles_for(user),
    Vec::new(),
    remember_me,
  )?;

  let refresh_token = promptforge_core::jwt::generate_refresh_token();
  let refresh_token_hash = promptforge_core::jwt::hash_refresh_token(&refresh_token);
  let refresh_expires_at = Utc::now() + Duration::seconds(promptforge_core::jwt::REFRESH_TOKEN_TTL_SECS);

  sessions
    .insert(
      user.id,
      &refresh_token_hash,
      None,
      auth_context.user_agent.as_deref(),
      auth_context.ip_address.as_deref(),
      refresh_expires_at,
    )
    .await?;

  Ok(AuthTokens {
    access_token,
    refresh_token,
    access_expires_at,
    refresh_expires_at,
  })
}

/// §4.2 `Register`.
#[allow(clippy::too_many_arguments)]
pub async fn register(
  users: &impl UserRepository,
  sessions: &impl SessionRepository,
  token_manager: &TokenManager,
  email: &str,
  username: &str,
  password: &str,
  confirm_password: &str,
  first_name: Option<&str>,
  last_name: Option<&str>,
  auth_context: &AuthContext,
) -> Result<(UserRow, AuthTokens), CoreError> {
  if is_weak_password(password) {
    return Err(CoreError::InvalidInput(
      "password must be at least 8 characters and include an uppercase letter, a lowercase letter, and a digit".into(),
    ));
  }
  if password != confirm_password {
    return Err(CoreError::InvalidInput(
      "password confirmation does not match".into(),
    ));
  }
  if is_reserved_username(username) {
    return Err(CoreError::InvalidInput("username is reserved".into()));
  }

  let password_hash = password::hash_password(password)?;
  let user = users
    .create(email, username, &password_hash, first_name, last_name)
    .await?;

  let tokens = issue_tokens(token_manager, sessions, &user, false, auth_context).await?;
  Ok((user, tokens))
}

/// §4.2 `Login`.
#[allow(clippy::too_many_arguments)]
pub async fn login(
  users: &impl UserRepository,
  sessions: &impl SessionRepository,
  audit: &PgApiUsageRepository,
  token_manager: &TokenManager,
  email_or_username: &str,
  password: &str,
  remember_me: bool,
  auth_context: &AuthContext,
) -> Result<(UserRow, AuthTokens), CoreError> {
  let now = Utc::now();
  let Some(user) = users.find_by_email_or_username(email_or_username).await? else {
    super::password::verify_dummy(password);
    return Err(CoreError::InvalidCredentials);
  };

  if user.is_locked(now) {
    return Err(CoreError::AccountLocked(user.lockout_until.unwrap()));
  }

  let password_ok = super::password::verify_password(password, &user.password_hash)?;
  if !password_ok || !user.active {
    let failures = user.failed_login_count + 1;
    let within_window = user
      .last_failed_login_at
      .map(|last| now.signed_duration_since(last) <= LOGIN_FAILURE_WINDOW)
      .unwrap_or(false);
    let lockout_engaged = failures >= MAX_LOGIN_FAILURES && within_window;
    let lockout_until = if lockout_engaged {
      Some(now + LOCKOUT_DURATION)
    } else {
      None
    };
    users.record_login_failure(user.id, lockout_until).await?;
    record_lockout_audit(
      audit,
      user.id,
      if lockout_engaged { "lockout_engaged" } else { "login_failure" },
      failures,
    );
    return Err(CoreError::InvalidCredentials);
  }

  let had_failures = user.failed_login_count > 0;
  users.reset_login_failures(user.id).await?;
  if had_failures {
    record_lockout_audit(audit, user.id, "lockout_cleared", 0);
  }

  let tokens = issue_tokens(token_manager, sessions, &user, remember_me, auth_context).await?;
  Ok((user, tokens))
}

/// Fire-and-forget write of one account-lockout transition row (§13).
fn record_lockout_audit(
  audit: &PgApiUsageRepository,
  user_id: promptforge_core::UserId,
  transition: &'static str,
  failed_login_count: i32,
) {
  let audit = audit.clone();
  tokio::spawn(async move {
    if let Err(err) = audit
      .record_lockout_transition(user_id, transition, failed_login_count)
      .await
    {
      tracing::warn!(error = ?err, "failed to write lockout audit row");
    }
  });
}

/// §4.2 `Refresh`. The session row's `revoke_if_active` update is the
/// atomic compare-and-set that guarantees exactly one winner among
/// concurrent refreshes of the same token.
pub async fn refresh(
  users: &impl UserRepository,
  sessions: &impl SessionRepository,
  token_manager: &TokenManager,
  refresh_token: &str,
  auth_context: &AuthContext,
) -> Result<(UserRow, AuthTokens), CoreError> {
  let token_hash = promptforge_core::jwt::hash_refresh_token(refresh_token);
  let session = sessions
    .find_by_token_hash(&token_hash)
    .await?
    .ok_or(CoreError::InvalidRefresh)?;

  let now = Utc::now();
  if session.revoked || session.expires_at <= now {
    return Err(CoreError::InvalidRefresh);
  }

  if let Some(issued_user_agent) = session.user_agent.as_deref() {
    if auth_context.user_agent_changed(Some(issued_user_agent)) {
      return Err(CoreError::InvalidRefresh);
    }
  }

  let won_race = sessions.revoke_if_active(session.id).await?;
  if !won_race {
    return Err(CoreError::InvalidRefresh);
  }

  let user = users
    .find_by_id(session.user_id)
    .await?
    .ok_or(CoreError::InvalidRefresh)?;

  let tokens = issue_tokens(token_manager, sessions, &user, false, auth_context).await?;
  Ok((user, tokens))
}

/// §4.2 `Logout`: revokes the session backing the presented refresh token.
pub async fn logout(sessions: &impl SessionRepository, refresh_token: &str) -> Result<(), CoreError> {
  let token_hash = promptforge_core::jwt::hash_refresh_token(refresh_token);
  let session = sessions
    .find_by_token_hash(&token_hash)
    .await?
    .ok_or(CoreError::InvalidRefresh)?;
  sessions.revoke(session.id).await
}

/// Updates the mutable profile fields (§6: `PUT /api/v1/auth/profile`).
pub async fn update_profile(
  users: &impl UserRepository,
  user_id: promptforge_core::UserId,
  first_name: Option<&str>,
  last_name: Option<&str>,
) -> Result<UserRow, CoreError> {
  users.update_profile(user_id, first_name, last_name).await
}

/// §6's `POST /api/v1/auth/change-password`: requires the current password
/// to verify before the new one is hashed and stored.
pub async fn change_password(
  users: &impl UserRepository,
  user_id: promptforge_core::UserId,
  current_password: &str,
  new_password: &str,
) -> Result<(), CoreError> {
  let user = users
    .find_by_id(user_id)
    .await?
    .ok_or(CoreError::NotFound)?;

  if !password::verify_password(current_password, &user.password_hash)? {
    return Err(CoreError::InvalidCredentials);
  }
  if is_weak_password(new_password) {
    return Err(CoreError::InvalidInput(
      "password must be at least 8 characters and include an uppercase letter, a lowercase letter, and a digit".into(),
    ));
  }

  let new_hash = password::hash_password(new_password)?;
  users.update_password_hash(user_id, &new_hash).await
}

/// Synthetic principal for the dev-mode bypass (§4.2): only ever
/// constructed by the middleware when `allow_test_mode_bypass` is set AND
/// the request carries `X-Test-Mode: true` — a hard no-op otherwise.
pub fn dev_bypass_principal() -> Principal {
  Principal {
    user_id: promptforge_core::UserId::new(),
    roles: vec![Role::User],
    permissions: vec![],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domains::auth::repository::{MockSessionRepository, MockUserRepository};
  use chrono::Duration as ChronoDuration;
  use sqlx::postgres::PgPoolOptions;

  #[test]
  fn weak_passwords_are_rejected() {
    assert!(is_weak_password("short1A"));
    assert!(is_weak_password("alllowercase1"));
    assert!(is_weak_password("ALLUPPERCASE1"));
    assert!(is_weak_password("NoDigitsHere"));
    assert!(!is_weak_password("Str0ngPassw0rd"));
  }

  #[test]
  fn reserved_usernames_are_case_insensitive() {
    assert!(is_reserved_username("Admin"));
    assert!(is_reserved_username("ROOT"));
    assert!(!is_reserved_username("alice"));
  }

  fn fixture_user(failed_login_count: i32, active: bool) -> UserRow {
    UserRow {
      id: promptforge_core::UserId::new(),
      email: "alice@example.com".into(),
      username: "alice".into(),
      password_hash: password::hash_password("Str0ngPassw0rd").unwrap(),
      first_name: None,
      last_name: None,
      roles: vec!["user".into()],
      tier: crate::models::Tier::Free,
      active,
      email_verified: false,
      failed_login_count,
      lockout_until: None,
      last_failed_login_at: if failed_login_count > 0 {
        Some(Utc::now() - ChronoDuration::minutes(1))
      } else {
        None
      },
      created_at: Utc::now() - ChronoDuration::days(30),
      updated_at: Utc::now() - ChronoDuration::days(30),
    }
  }

  // `PgPool::connect_lazy` parses the URL but never dials out, so the audit
  // sink's fire-and-forget writes are harmless no-ops against it in tests
  // that never await them.
  fn lazy_audit() -> PgApiUsageRepository {
    let pool = PgPoolOptions::new()
      .connect_lazy("postgres://localhost/promptforge_test")
      .expect("lazy pool construction never dials out");
    PgApiUsageRepository::new(pool)
  }

  #[tokio::test]
  async fn login_rejects_wrong_password_without_touching_sessions() {
    let mut users = MockUserRepository::new();
    let user = fixture_user(0, true);
    let returned_user = user.clone();
    users
      .expect_find_by_email_or_username()
      .returning(move |_| Ok(Some(returned_user.clone())));
    users
      .expect_record_login_failure()
      .returning(|_, _| Ok(()));

    let sessions = MockSessionRepository::new();
    let audit = lazy_audit();
    let token_manager = TokenManager::new("test-secret-at-least-this-long");
    let auth_context = AuthContext {
      user_agent: None,
      ip_address: None,
    };

    let result = login(
      &users,
      &sessions,
      &audit,
      &token_manager,
      "alice",
      "wrong-password",
      false,
      &auth_context,
    )
    .await;

    assert!(matches!(result, Err(CoreError::InvalidCredentials)));
  }

  #[tokio::test]
  async fn login_engages_lockout_on_the_fifth_failure_within_the_window() {
    let mut users = MockUserRepository::new();
    let user = fixture_user(MAX_LOGIN_FAILURES - 1, true);
    let returned_user = user.clone();
    users
      .expect_find_by_email_or_username()
      .returning(move |_| Ok(Some(returned_user.clone())));
    users
      .expect_record_login_failure()
      .withf(|_, lockout_until| lockout_until.is_some())
      .returning(|_, _| Ok(()));

    let sessions = MockSessionRepository::new();
    let audit = lazy_audit();
    let token_manager = TokenManager::new("test-secret-at-least-this-long");
    let auth_context = AuthContext {
      user_agent: None,
      ip_address: None,
    };

    let result = login(
      &users,
      &sessions,
      &audit,
      &token_manager,
      "alice",
      "wrong-password",
      false,
      &auth_context,
    )
    .await;

    assert!(matches!(result, Err(CoreError::InvalidCredentials)));
  }

  #[tokio::test]
  async fn login_succeeds_and_issues_tokens_on_correct_password() {
    let mut users = MockUserRepository::new();
    let user = fixture_user(2, true);
    let returned_user = user.clone();
    users
      .expect_find_by_email_or_username()
      .returning(move |_| Ok(Some(returned_user.clone())));
    users.expect_reset_login_failures().returning(|_| Ok(()));

    let mut sessions = MockSessionRepository::new();
    sessions.expect_insert().returning(move |_, _, _, _, _, _| {
      Ok(crate::models::SessionRow {
        id: promptforge_core::SessionId::new(),
        user_id: user.id,
        token_hash: "hash".into(),
        device_fingerprint: None,
        user_agent: None,
        ip_address: None,
        issued_at: Utc::now(),
        expires_at: Utc::now() + ChronoDuration::days(30),
        revoked: false,
      })
    });

    let audit = lazy_audit();
    let token_manager = TokenManager::new("test-secret-at-least-this-long");
    let auth_context = AuthContext {
      user_agent: None,
      ip_address: None,
    };

    let (_, tokens) = login(
      &users,
      &sessions,
      &audit,
      &token_manager,
      "alice",
      "Str0ngPassw0rd",
      false,
      &auth_context,
    )
    .await
    .unwrap();

    assert!(!tokens.access_token.is_empty());
  }
}
