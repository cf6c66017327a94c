//! Collaborator traits: the stores and sinks the core calls into.
//!
//! The traits are implemented by storage backends (e.g.
//! `accolade-store-memory`). The authorization and lifecycle services depend
//! on these abstractions, never on a concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes. Lookups return `Ok(None)` for a missing row;
//! `Err` always means the backend itself failed.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  achievement::{AchievementDocument, DocumentId},
  notification::Notification,
  rbac::{Permission, PermissionSet, Role},
  status::{AchievementReference, StatusChange},
  user::{Advisor, Student, UserAccount},
};

/// Backend error bound shared by every collaborator.
pub trait StoreError: std::error::Error + Send + Sync + 'static {}

impl<E> StoreError for E where E: std::error::Error + Send + Sync + 'static {}

// ─── Permissions ─────────────────────────────────────────────────────────────

/// Read-only source of role → permission facts.
pub trait PermissionStore: Send + Sync {
  type Error: StoreError;

  /// Names of every permission bound to `role_id`, or `None` if the role
  /// does not exist.
  fn permissions_for_role(
    &self,
    role_id: Uuid,
  ) -> impl Future<Output = Result<Option<PermissionSet>, Self::Error>> + Send + '_;

  fn get_role(
    &self,
    role_id: Uuid,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  /// Full permission records for display, ordered by resource then action.
  fn role_permissions(
    &self,
    role_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Permission>, Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub trait CredentialStore: Send + Sync {
  type Error: StoreError;

  /// Find an account by username or email.
  fn find_account<'a>(
    &'a self,
    identifier: &'a str,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + 'a;
}

// ─── Achievements ────────────────────────────────────────────────────────────

/// Persists achievement documents (document store) and the reference rows
/// that track their lifecycle (relational store).
///
/// The two halves are not transactional with each other. Every reference
/// mutation is a single conditional write that reports how many rows it
/// touched; `0` means the precondition no longer held.
pub trait AchievementStore: Send + Sync {
  type Error: StoreError;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Persist `doc` and return the identifier the store assigned. Any `id`
  /// already on `doc` is ignored.
  fn create_document(
    &self,
    doc: AchievementDocument,
  ) -> impl Future<Output = Result<DocumentId, Self::Error>> + Send + '_;

  fn get_document<'a>(
    &'a self,
    id: &'a DocumentId,
  ) -> impl Future<Output = Result<Option<AchievementDocument>, Self::Error>> + Send + 'a;

  /// Overwrite the payload of a live document, keeping its identity and
  /// creation time. Returns the number of documents replaced.
  fn replace_document(
    &self,
    doc: AchievementDocument,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Remove a document outright. Only used to clean up after a failed
  /// creation.
  fn delete_document<'a>(
    &'a self,
    id: &'a DocumentId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn soft_delete_document<'a>(
    &'a self,
    id: &'a DocumentId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── References ────────────────────────────────────────────────────────

  fn create_reference(
    &self,
    reference: AchievementReference,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_reference(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AchievementReference>, Self::Error>> + Send + '_;

  /// Live (not soft-deleted) references of one student, newest first.
  fn list_references_for_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AchievementReference>, Self::Error>> + Send + '_;

  /// Apply `change` only if the reference is live and still in
  /// `change.from`. Returns the number of rows updated (0 or 1).
  fn update_reference_status(
    &self,
    id: Uuid,
    change: StatusChange,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Soft-delete a live draft. Returns the number of rows updated (0 or 1).
  fn soft_delete_reference(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn get_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn get_student_by_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn get_advisor(
    &self,
    advisor_id: Uuid,
  ) -> impl Future<Output = Result<Option<Advisor>, Self::Error>> + Send + '_;

  fn get_advisor_by_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Advisor>, Self::Error>> + Send + '_;

  /// Students whose advisor of record is `advisor_id`.
  fn list_advisees(
    &self,
    advisor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// Fire-and-forget delivery. Callers log failures; they never propagate them.
pub trait NotificationSink: Send + Sync {
  type Error: StoreError;

  fn notify(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
