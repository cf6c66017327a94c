//! The request-edge check: bearer header → subject → permission.

use std::sync::Arc;

use accolade_core::{Error, Result, store::PermissionStore, subject::Subject};

use crate::{authz::AuthorizationService, token::TokenService};

pub struct Gate<P> {
  tokens: Arc<TokenService>,
  authz:  AuthorizationService<P>,
}

impl<P> Clone for Gate<P> {
  fn clone(&self) -> Self {
    Self { tokens: Arc::clone(&self.tokens), authz: self.authz.clone() }
  }
}

impl<P: PermissionStore> Gate<P> {
  pub fn new(tokens: Arc<TokenService>, authz: AuthorizationService<P>) -> Self {
    Self { tokens, authz }
  }

  /// Resolve an `Authorization` header value to the subject it names.
  /// Accepts `Bearer <token>` or the bare token.
  pub fn authenticate(&self, header: &str) -> Result<Subject> {
    let header = header.trim();
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
      return Err(Error::InvalidToken("missing token".to_owned()));
    }
    Ok(self.tokens.parse(token)?.subject())
  }

  /// [`authenticate`](Self::authenticate), then require `permission`.
  pub async fn authorize(&self, header: &str, permission: &str) -> Result<Subject> {
    let subject = self.authenticate(header)?;
    self.authz.require_permission(subject, permission).await?;
    Ok(subject)
  }
}
