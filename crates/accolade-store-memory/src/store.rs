//! [`MemoryStore`]: the in-process implementation of the collaborator traits.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use accolade_core::{
  achievement::{AchievementDocument, DocumentId},
  notification::Notification,
  rbac::{Permission, PermissionSet, Role},
  status::{AchievementReference, StatusChange, Transition},
  store::{AchievementStore, CredentialStore, NotificationSink, PermissionStore},
  user::{Advisor, Student, UserAccount},
};

use crate::{Error, Result};

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct State {
  roles:         HashMap<Uuid, Role>,
  /// role id → granted permissions
  grants:        HashMap<Uuid, Vec<Permission>>,
  accounts:      HashMap<Uuid, UserAccount>,
  students:      HashMap<Uuid, Student>,
  advisors:      HashMap<Uuid, Advisor>,
  documents:     HashMap<DocumentId, AchievementDocument>,
  references:    HashMap<Uuid, AchievementReference>,
  notifications: Vec<Notification>,
}

#[derive(Default)]
struct Inner {
  state:                   RwLock<State>,
  offline:                 AtomicBool,
  notifications_offline:   AtomicBool,
  reject_reference_writes: AtomicBool,
  latency_ms:              AtomicU64,
  permission_lookups:      AtomicUsize,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Accolade store held entirely in memory.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Simulated latency and outage, applied at the start of every call.
  async fn enter(&self) -> Result<()> {
    let latency = self.inner.latency_ms.load(Ordering::Relaxed);
    if latency > 0 {
      tokio::time::sleep(Duration::from_millis(latency)).await;
    }
    if self.inner.offline.load(Ordering::Relaxed) {
      return Err(Error::Offline);
    }
    Ok(())
  }

  // ── Fault injection ───────────────────────────────────────────────────

  pub fn set_offline(&self, offline: bool) {
    self.inner.offline.store(offline, Ordering::Relaxed);
  }

  pub fn set_notifications_offline(&self, offline: bool) {
    self.inner.notifications_offline.store(offline, Ordering::Relaxed);
  }

  pub fn set_reject_reference_writes(&self, reject: bool) {
    self.inner.reject_reference_writes.store(reject, Ordering::Relaxed);
  }

  pub fn set_latency(&self, latency: Duration) {
    let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    self.inner.latency_ms.store(ms, Ordering::Relaxed);
  }

  // ── Seeding ───────────────────────────────────────────────────────────

  /// Create a role granting `permissions`.
  pub fn add_role(&self, name: &str, description: &str, permissions: &[&str]) -> Role {
    let role = Role {
      id:          Uuid::new_v4(),
      name:        name.to_owned(),
      description: description.to_owned(),
      created_at:  Utc::now(),
    };
    let mut state = self.inner.state.write();
    state.roles.insert(role.id, role.clone());
    state.grants.insert(
      role.id,
      permissions.iter().map(|name| Permission::from_name(*name)).collect(),
    );
    role
  }

  /// Replace the grants of an existing role.
  pub fn set_role_permissions(&self, role_id: Uuid, permissions: &[&str]) {
    self.inner.state.write().grants.insert(
      role_id,
      permissions.iter().map(|name| Permission::from_name(*name)).collect(),
    );
  }

  pub fn add_account(
    &self,
    username: &str,
    password_hash: &str,
    role_id: Uuid,
    is_active: bool,
  ) -> UserAccount {
    let account = UserAccount {
      id: Uuid::new_v4(),
      username: username.to_owned(),
      email: format!("{username}@example.ac.id"),
      password_hash: password_hash.to_owned(),
      full_name: username.to_owned(),
      role_id,
      is_active,
      created_at: Utc::now(),
    };
    self.inner.state.write().accounts.insert(account.id, account.clone());
    account
  }

  pub fn add_advisor(&self, user_id: Uuid, full_name: &str) -> Advisor {
    let advisor = Advisor {
      id:              Uuid::new_v4(),
      user_id,
      lecturer_number: format!("L-{}", &user_id.simple().to_string()[..8]),
      full_name:       full_name.to_owned(),
      department:      "Informatics".to_owned(),
    };
    self.inner.state.write().advisors.insert(advisor.id, advisor.clone());
    advisor
  }

  pub fn add_student(&self, user_id: Uuid, full_name: &str, advisor_id: Option<Uuid>) -> Student {
    let student = Student {
      id:             Uuid::new_v4(),
      user_id,
      student_number: format!("S-{}", &user_id.simple().to_string()[..8]),
      full_name:      full_name.to_owned(),
      program_study:  "Informatics".to_owned(),
      academic_year:  "2025/2026".to_owned(),
      advisor_id,
    };
    self.inner.state.write().students.insert(student.id, student.clone());
    student
  }

  // ── Inspection ────────────────────────────────────────────────────────

  /// Every notification delivered so far, oldest first.
  pub fn notifications(&self) -> Vec<Notification> {
    self.inner.state.read().notifications.clone()
  }

  /// How many times `permissions_for_role` reached the store.
  pub fn permission_lookups(&self) -> usize {
    self.inner.permission_lookups.load(Ordering::Relaxed)
  }

  pub fn document_count(&self) -> usize { self.inner.state.read().documents.len() }
}

// ─── PermissionStore impl ────────────────────────────────────────────────────

impl PermissionStore for MemoryStore {
  type Error = Error;

  async fn permissions_for_role(&self, role_id: Uuid) -> Result<Option<PermissionSet>> {
    self.enter().await?;
    self.inner.permission_lookups.fetch_add(1, Ordering::Relaxed);

    let state = self.inner.state.read();
    if !state.roles.contains_key(&role_id) {
      return Ok(None);
    }
    let names: PermissionSet = state
      .grants
      .get(&role_id)
      .map(|perms| perms.iter().map(|p| p.name.clone()).collect())
      .unwrap_or_default();
    Ok(Some(names))
  }

  async fn get_role(&self, role_id: Uuid) -> Result<Option<Role>> {
    self.enter().await?;
    Ok(self.inner.state.read().roles.get(&role_id).cloned())
  }

  async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>> {
    self.enter().await?;
    let mut perms = self
      .inner
      .state
      .read()
      .grants
      .get(&role_id)
      .cloned()
      .unwrap_or_default();
    perms.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
    Ok(perms)
  }
}

// ─── CredentialStore impl ────────────────────────────────────────────────────

impl CredentialStore for MemoryStore {
  type Error = Error;

  async fn find_account(&self, identifier: &str) -> Result<Option<UserAccount>> {
    self.enter().await?;
    Ok(
      self
        .inner
        .state
        .read()
        .accounts
        .values()
        .find(|a| a.matches_identifier(identifier))
        .cloned(),
    )
  }
}

// ─── AchievementStore impl ───────────────────────────────────────────────────

impl AchievementStore for MemoryStore {
  type Error = Error;

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn create_document(&self, mut doc: AchievementDocument) -> Result<DocumentId> {
    self.enter().await?;
    doc.id = DocumentId(Uuid::new_v4().simple().to_string());
    let id = doc.id.clone();
    self.inner.state.write().documents.insert(id.clone(), doc);
    Ok(id)
  }

  async fn get_document(&self, id: &DocumentId) -> Result<Option<AchievementDocument>> {
    self.enter().await?;
    Ok(self.inner.state.read().documents.get(id).cloned())
  }

  async fn replace_document(&self, doc: AchievementDocument) -> Result<u64> {
    self.enter().await?;
    let mut state = self.inner.state.write();
    match state.documents.get_mut(&doc.id) {
      Some(existing) if !existing.is_deleted => {
        let created_at = existing.created_at;
        *existing = AchievementDocument { created_at, ..doc };
        Ok(1)
      }
      _ => Ok(0),
    }
  }

  async fn delete_document(&self, id: &DocumentId) -> Result<()> {
    self.enter().await?;
    self.inner.state.write().documents.remove(id);
    Ok(())
  }

  async fn soft_delete_document(&self, id: &DocumentId, at: DateTime<Utc>) -> Result<u64> {
    self.enter().await?;
    let mut state = self.inner.state.write();
    match state.documents.get_mut(id) {
      Some(doc) if !doc.is_deleted => {
        doc.is_deleted = true;
        doc.deleted_at = Some(at);
        doc.updated_at = at;
        Ok(1)
      }
      _ => Ok(0),
    }
  }

  // ── References ────────────────────────────────────────────────────────────

  async fn create_reference(&self, reference: AchievementReference) -> Result<()> {
    self.enter().await?;
    if self.inner.reject_reference_writes.load(Ordering::Relaxed) {
      return Err(Error::ReferenceWriteRejected);
    }
    let mut state = self.inner.state.write();
    if state.references.contains_key(&reference.id) {
      return Err(Error::Duplicate(reference.id.to_string()));
    }
    state.references.insert(reference.id, reference);
    Ok(())
  }

  async fn get_reference(&self, id: Uuid) -> Result<Option<AchievementReference>> {
    self.enter().await?;
    Ok(self.inner.state.read().references.get(&id).cloned())
  }

  async fn list_references_for_student(
    &self,
    student_id: Uuid,
  ) -> Result<Vec<AchievementReference>> {
    self.enter().await?;
    let mut refs: Vec<_> = self
      .inner
      .state
      .read()
      .references
      .values()
      .filter(|r| r.student_id == student_id && !r.is_deleted)
      .cloned()
      .collect();
    refs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(refs)
  }

  async fn update_reference_status(&self, id: Uuid, change: StatusChange) -> Result<u64> {
    self.enter().await?;
    // Match and write under one guard: the equivalent of
    // `UPDATE … WHERE id = ? AND status = ? AND is_deleted = false`.
    let mut state = self.inner.state.write();
    match state.references.get_mut(&id) {
      Some(r) if r.status == change.from && !r.is_deleted => {
        r.apply(&change);
        Ok(1)
      }
      _ => Ok(0),
    }
  }

  async fn soft_delete_reference(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64> {
    self.enter().await?;
    let mut state = self.inner.state.write();
    match state.references.get_mut(&id) {
      Some(r) if r.status.permits(Transition::Delete) && !r.is_deleted => {
        r.is_deleted = true;
        r.deleted_at = Some(at);
        r.updated_at = at;
        Ok(1)
      }
      _ => Ok(0),
    }
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_student(&self, student_id: Uuid) -> Result<Option<Student>> {
    self.enter().await?;
    Ok(self.inner.state.read().students.get(&student_id).cloned())
  }

  async fn get_student_by_user(&self, user_id: Uuid) -> Result<Option<Student>> {
    self.enter().await?;
    Ok(
      self
        .inner
        .state
        .read()
        .students
        .values()
        .find(|s| s.user_id == user_id)
        .cloned(),
    )
  }

  async fn get_advisor(&self, advisor_id: Uuid) -> Result<Option<Advisor>> {
    self.enter().await?;
    Ok(self.inner.state.read().advisors.get(&advisor_id).cloned())
  }

  async fn get_advisor_by_user(&self, user_id: Uuid) -> Result<Option<Advisor>> {
    self.enter().await?;
    Ok(
      self
        .inner
        .state
        .read()
        .advisors
        .values()
        .find(|a| a.user_id == user_id)
        .cloned(),
    )
  }

  async fn list_advisees(&self, advisor_id: Uuid) -> Result<Vec<Student>> {
    self.enter().await?;
    Ok(
      self
        .inner
        .state
        .read()
        .students
        .values()
        .filter(|s| s.advisor_id == Some(advisor_id))
        .cloned()
        .collect(),
    )
  }
}

// ─── NotificationSink impl ───────────────────────────────────────────────────

impl NotificationSink for MemoryStore {
  type Error = Error;

  async fn notify(&self, notification: Notification) -> Result<()> {
    self.enter().await?;
    if self.inner.notifications_offline.load(Ordering::Relaxed) {
      return Err(Error::DeliveryFailed);
    }
    self.inner.state.write().notifications.push(notification);
    Ok(())
  }
}
