//! Roles, permissions and resolved permission sets.

use std::{collections::BTreeSet, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub id:          Uuid,
  /// Compared exactly and case-sensitively by role checks.
  pub name:        String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

/// An atomic capability. Only `name` takes part in authorization; `resource`
/// and `action` exist for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
  pub id:          Uuid,
  /// e.g. `achievement.write`
  pub name:        String,
  pub resource:    String,
  pub action:      String,
  pub description: Option<String>,
}

impl Permission {
  /// Build a permission whose resource and action are split from a dotted
  /// name (`"achievement.verify"` → `achievement` / `verify`).
  pub fn from_name(name: impl Into<String>) -> Self {
    let name = name.into();
    let (resource, action) = match name.split_once('.') {
      Some((resource, action)) => (resource.to_owned(), action.to_owned()),
      None => (name.clone(), String::new()),
    };
    Self { id: Uuid::new_v4(), name, resource, action, description: None }
  }
}

/// A role together with the metadata of everything it grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleGrants {
  pub role:        Role,
  pub permissions: Vec<Permission>,
}

// ─── PermissionSet ───────────────────────────────────────────────────────────

/// The resolved permission names of one subject.
///
/// Immutable once built. Cloning shares the underlying set, so the cache can
/// hand out copies without holding its lock.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(Arc<BTreeSet<String>>);

impl PermissionSet {
  pub fn empty() -> Self { Self::default() }

  /// Exact, case-sensitive membership.
  pub fn contains(&self, name: &str) -> bool { self.0.contains(name) }

  pub fn contains_any(&self, names: &[&str]) -> bool {
    names.iter().any(|name| self.contains(name))
  }

  /// Every entry of `names` that is not granted, in the order given.
  pub fn missing(&self, names: &[&str]) -> Vec<String> {
    names
      .iter()
      .filter(|name| !self.contains(name))
      .map(|name| (*name).to_owned())
      .collect()
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &str> { self.0.iter().map(String::as_str) }

  pub fn to_vec(&self) -> Vec<String> { self.0.iter().cloned().collect() }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self(Arc::new(iter.into_iter().map(Into::into).collect()))
  }
}

impl fmt::Debug for PermissionSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.0.iter()).finish()
  }
}
