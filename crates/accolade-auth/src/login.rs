//! Exchanging credentials for a session token.

use std::{sync::Arc, time::Duration};

use accolade_core::{
  Error, Result,
  deadline::bounded,
  rbac::PermissionSet,
  store::{CredentialStore, PermissionStore},
  subject::Subject,
  user::UserAccount,
};
use tracing::{info, warn};

use crate::{
  authz::AuthorizationService,
  password::verify_password,
  token::{IssuedToken, TokenService},
};

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
  pub token:   IssuedToken,
  pub account: UserAccount,
}

pub struct Authenticator<C, P> {
  accounts:      Arc<C>,
  authz:         AuthorizationService<P>,
  tokens:        Arc<TokenService>,
  store_timeout: Duration,
}

impl<C, P> Authenticator<C, P>
where
  C: CredentialStore,
  P: PermissionStore,
{
  pub fn new(
    accounts: Arc<C>,
    authz: AuthorizationService<P>,
    tokens: Arc<TokenService>,
    store_timeout: Duration,
  ) -> Self {
    Self { accounts, authz, tokens, store_timeout }
  }

  /// Check `password` for the account named by `identifier` (username or
  /// email) and issue a session token.
  ///
  /// Unknown accounts and wrong passwords fail the same way. If the
  /// account's permissions cannot be resolved the token is issued with an
  /// empty snapshot.
  pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome> {
    let account = bounded(
      "find account",
      self.store_timeout,
      self.accounts.find_account(identifier),
    )
    .await?
    .ok_or(Error::InvalidCredentials)?;

    if !verify_password(password, &account.password_hash) {
      info!(user_id = %account.id, "login rejected: wrong password");
      return Err(Error::InvalidCredentials);
    }
    if !account.is_active {
      return Err(Error::AccountInactive(account.id));
    }

    let subject = Subject::new(account.id, account.role_id);
    let permissions = match self.authz.resolve_permissions(subject).await {
      Ok(permissions) => permissions,
      Err(e) => {
        warn!(user_id = %account.id, error = %e, "issuing token without permissions");
        PermissionSet::empty()
      }
    };

    let token = self.tokens.issue_session(subject, &permissions)?;
    info!(user_id = %account.id, permissions = permissions.len(), "login succeeded");
    Ok(LoginOutcome { token, account })
  }

  /// Exchange a live session token for a new one.
  ///
  /// An expired token fails with [`Error::TokenExpired`] and a forged or
  /// revoked one with [`Error::InvalidToken`]; the caller tells "log in
  /// again" from "reject" by that difference. The new token carries the
  /// subject's current permissions, read past the cache, and the old one
  /// is revoked. Of two concurrent refreshes of one token, only one wins.
  pub async fn refresh(&self, token: &str) -> Result<IssuedToken> {
    let claims = self.tokens.parse(token)?;
    let subject = claims.subject();

    self.authz.invalidate_subject(subject.user_id);
    let permissions = self.authz.resolve_permissions(subject).await?;

    if !self.tokens.revoke(&claims) {
      return Err(Error::InvalidToken("token revoked".to_owned()));
    }
    let issued = self.tokens.issue_session(subject, &permissions)?;
    info!(user_id = %subject.user_id, old = %claims.jti, new = %issued.claims.jti, "session refreshed");
    Ok(issued)
  }
}
