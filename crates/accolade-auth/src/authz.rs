//! Permission checks backed by the cache.

use std::{sync::Arc, time::Duration};

use accolade_core::{
  Error, Result,
  deadline::bounded,
  rbac::{PermissionSet, RoleGrants},
  store::PermissionStore,
  subject::Subject,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::PermissionCache;

/// Answers "may this subject do that?".
///
/// Reads through [`PermissionCache`] and falls back to the
/// [`PermissionStore`] on a miss. Never writes to the store and never
/// retries a failed lookup; store failures surface as
/// [`Error::Unavailable`] and the caller decides whether to deny.
pub struct AuthorizationService<P> {
  store:         Arc<P>,
  cache:         Arc<PermissionCache>,
  store_timeout: Duration,
}

impl<P> Clone for AuthorizationService<P> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      cache:         Arc::clone(&self.cache),
      store_timeout: self.store_timeout,
    }
  }
}

impl<P: PermissionStore> AuthorizationService<P> {
  pub fn new(store: Arc<P>, cache: Arc<PermissionCache>, store_timeout: Duration) -> Self {
    Self { store, cache, store_timeout }
  }

  pub fn cache(&self) -> &Arc<PermissionCache> { &self.cache }

  /// The subject's permission set, from cache when fresh.
  pub async fn resolve_permissions(&self, subject: Subject) -> Result<PermissionSet> {
    if let Some(permissions) = self.cache.get(subject.user_id) {
      debug!(user_id = %subject.user_id, "permission cache hit");
      return Ok(permissions);
    }

    debug!(user_id = %subject.user_id, role_id = %subject.role_id, "permission cache miss");
    let permissions = bounded(
      "load role permissions",
      self.store_timeout,
      self.store.permissions_for_role(subject.role_id),
    )
    .await?
    .ok_or(Error::RoleNotFound(subject.role_id))?;

    self.cache.set(subject.user_id, permissions.clone());
    Ok(permissions)
  }

  pub async fn has_permission(&self, subject: Subject, permission: &str) -> Result<bool> {
    Ok(self.resolve_permissions(subject).await?.contains(permission))
  }

  /// True if at least one of `permissions` is granted. An empty list grants
  /// nothing.
  pub async fn has_any_permission(&self, subject: Subject, permissions: &[&str]) -> Result<bool> {
    Ok(self.resolve_permissions(subject).await?.contains_any(permissions))
  }

  /// True if every one of `permissions` is granted. Each missing name is
  /// logged.
  pub async fn has_all_permissions(&self, subject: Subject, permissions: &[&str]) -> Result<bool> {
    let missing = self.missing_permissions(subject, permissions).await?;
    for name in &missing {
      debug!(user_id = %subject.user_id, permission = %name, "permission not granted");
    }
    Ok(missing.is_empty())
  }

  /// The entries of `permissions` the subject lacks, in the order given.
  pub async fn missing_permissions(
    &self,
    subject: Subject,
    permissions: &[&str],
  ) -> Result<Vec<String>> {
    Ok(self.resolve_permissions(subject).await?.missing(permissions))
  }

  /// Whether the role named `expected` is the one with id `role_id`.
  /// Names compare exactly.
  pub async fn has_role(&self, role_id: Uuid, expected: &str) -> Result<bool> {
    let role = bounded("load role", self.store_timeout, self.store.get_role(role_id))
      .await?
      .ok_or(Error::RoleNotFound(role_id))?;
    Ok(role.name == expected)
  }

  // ── Guards ────────────────────────────────────────────────────────────

  pub async fn require_permission(&self, subject: Subject, permission: &str) -> Result<()> {
    self.require_all(subject, &[permission]).await
  }

  pub async fn require_any(&self, subject: Subject, permissions: &[&str]) -> Result<()> {
    if self.has_any_permission(subject, permissions).await? {
      return Ok(());
    }
    warn!(user_id = %subject.user_id, ?permissions, "none of the permissions granted");
    Err(Error::Forbidden { missing: permissions.iter().map(|p| (*p).to_owned()).collect() })
  }

  pub async fn require_all(&self, subject: Subject, permissions: &[&str]) -> Result<()> {
    let missing = self.missing_permissions(subject, permissions).await?;
    if missing.is_empty() {
      return Ok(());
    }
    warn!(user_id = %subject.user_id, ?missing, "permission denied");
    Err(Error::Forbidden { missing })
  }

  pub async fn require_role(&self, subject: Subject, expected: &str) -> Result<()> {
    if self.has_role(subject.role_id, expected).await? {
      Ok(())
    } else {
      Err(Error::RoleRequired { expected: expected.to_owned() })
    }
  }

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Forget the cached set of one user, e.g. after their role changed.
  pub fn invalidate_subject(&self, user_id: Uuid) { self.cache.invalidate(user_id); }

  /// Forget every cached set, e.g. after a role's grants changed.
  pub fn invalidate_all(&self) { self.cache.invalidate_all(); }

  /// A role with the metadata of every permission it grants.
  pub async fn role_grants(&self, role_id: Uuid) -> Result<RoleGrants> {
    let role = bounded("load role", self.store_timeout, self.store.get_role(role_id))
      .await?
      .ok_or(Error::RoleNotFound(role_id))?;
    let permissions = bounded(
      "load role permissions",
      self.store_timeout,
      self.store.role_permissions(role_id),
    )
    .await?;
    Ok(RoleGrants { role, permissions })
  }
}
