//! Tests for `MemoryStore` against the collaborator contracts.

use std::sync::Arc;

use accolade_core::{
  achievement::{AchievementKind, NewAchievement},
  notification::Notification,
  status::{AchievementReference, AchievementStatus, StatusChange},
  store::{AchievementStore, CredentialStore, NotificationSink, PermissionStore},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{Error, MemoryStore};

async fn draft(s: &MemoryStore, student_id: Uuid) -> AchievementReference {
  let doc = NewAchievement::new("Robotics finalist", AchievementKind::Other)
    .into_document(student_id, Utc::now());
  let doc_id = s.create_document(doc).await.unwrap();
  let reference = AchievementReference::draft(student_id, doc_id, Utc::now());
  s.create_reference(reference.clone()).await.unwrap();
  reference
}

// ─── Permissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn permissions_for_known_role() {
  let s = MemoryStore::new();
  let role = s.add_role("Mahasiswa", "student", &["achievement.write", "achievement.read"]);

  let perms = s.permissions_for_role(role.id).await.unwrap().unwrap();
  assert_eq!(perms.len(), 2);
  assert!(perms.contains("achievement.write"));
  assert_eq!(s.permission_lookups(), 1);
}

#[tokio::test]
async fn permissions_for_unknown_role_is_none() {
  let s = MemoryStore::new();
  assert!(s.permissions_for_role(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn role_permissions_are_sorted_for_display() {
  let s = MemoryStore::new();
  let role = s.add_role("Admin", "", &["user.manage", "achievement.verify", "achievement.read"]);

  let names: Vec<_> = s
    .role_permissions(role.id)
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.name)
    .collect();
  assert_eq!(names, vec!["achievement.read", "achievement.verify", "user.manage"]);
}

#[tokio::test]
async fn offline_store_fails_every_call() {
  let s = MemoryStore::new();
  let role = s.add_role("Admin", "", &[]);
  s.set_offline(true);

  assert!(matches!(s.get_role(role.id).await, Err(Error::Offline)));
  assert!(matches!(s.permissions_for_role(role.id).await, Err(Error::Offline)));

  s.set_offline(false);
  assert!(s.get_role(role.id).await.unwrap().is_some());
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accounts_found_by_username_or_email() {
  let s = MemoryStore::new();
  let role = s.add_role("Mahasiswa", "", &[]);
  let account = s.add_account("ayu", "$argon2id$stub", role.id, true);

  let by_name = s.find_account("ayu").await.unwrap().unwrap();
  let by_email = s.find_account(&account.email).await.unwrap().unwrap();
  assert_eq!(by_name.id, account.id);
  assert_eq!(by_email.id, account.id);
  assert!(s.find_account("nobody").await.unwrap().is_none());
}

// ─── References ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn conditional_update_requires_matching_status() {
  let s = MemoryStore::new();
  let r = draft(&s, Uuid::new_v4()).await;

  let advisor = Uuid::new_v4();
  let touched = s
    .update_reference_status(r.id, StatusChange::verify(advisor, Utc::now()))
    .await
    .unwrap();
  assert_eq!(touched, 0, "draft cannot be verified");

  let touched = s.update_reference_status(r.id, StatusChange::submit(Utc::now())).await.unwrap();
  assert_eq!(touched, 1);

  let touched = s.update_reference_status(r.id, StatusChange::submit(Utc::now())).await.unwrap();
  assert_eq!(touched, 0, "second submit matches no row");

  let stored = s.get_reference(r.id).await.unwrap().unwrap();
  assert_eq!(stored.status, AchievementStatus::Submitted);
  assert!(stored.submitted_at.is_some());
}

#[tokio::test]
async fn concurrent_updates_have_one_winner() {
  let s = Arc::new(MemoryStore::new());
  let id = draft(&s, Uuid::new_v4()).await.id;

  let mut tasks = Vec::new();
  for _ in 0..16 {
    let s = Arc::clone(&s);
    tasks.push(tokio::spawn(async move {
      s.update_reference_status(id, StatusChange::submit(Utc::now())).await.unwrap()
    }));
  }

  let mut total = 0;
  for task in tasks {
    total += task.await.unwrap();
  }
  assert_eq!(total, 1);
}

#[tokio::test]
async fn soft_delete_only_touches_live_drafts() {
  let s = MemoryStore::new();
  let r = draft(&s, Uuid::new_v4()).await;

  assert_eq!(s.soft_delete_reference(r.id, Utc::now()).await.unwrap(), 1);
  assert_eq!(s.soft_delete_reference(r.id, Utc::now()).await.unwrap(), 0);

  // A deleted draft is invisible to status updates too.
  let touched = s.update_reference_status(r.id, StatusChange::submit(Utc::now())).await.unwrap();
  assert_eq!(touched, 0);

  let submitted = draft(&s, Uuid::new_v4()).await;
  s.update_reference_status(submitted.id, StatusChange::submit(Utc::now())).await.unwrap();
  assert_eq!(s.soft_delete_reference(submitted.id, Utc::now()).await.unwrap(), 0);
}

#[tokio::test]
async fn listing_skips_deleted_and_other_students() {
  let s = MemoryStore::new();
  let student = Uuid::new_v4();
  let keep = draft(&s, student).await;
  let gone = draft(&s, student).await;
  draft(&s, Uuid::new_v4()).await;

  s.soft_delete_reference(gone.id, Utc::now()).await.unwrap();

  let refs = s.list_references_for_student(student).await.unwrap();
  assert_eq!(refs.len(), 1);
  assert_eq!(refs[0].id, keep.id);
}

#[tokio::test]
async fn rejected_reference_writes_leave_documents_behind() {
  let s = MemoryStore::new();
  s.set_reject_reference_writes(true);

  let doc = NewAchievement::new("x", AchievementKind::Academic).into_document(Uuid::new_v4(), Utc::now());
  let doc_id = s.create_document(doc).await.unwrap();
  let result = s
    .create_reference(AchievementReference::draft(Uuid::new_v4(), doc_id.clone(), Utc::now()))
    .await;

  assert!(matches!(result, Err(Error::ReferenceWriteRejected)));
  assert_eq!(s.document_count(), 1);

  s.delete_document(&doc_id).await.unwrap();
  assert_eq!(s.document_count(), 0);
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_keeps_creation_time_and_skips_deleted() {
  let s = MemoryStore::new();
  let r = draft(&s, Uuid::new_v4()).await;
  let original = s.get_document(&r.document_id).await.unwrap().unwrap();

  let mut updated = original.clone();
  updated.title = "Robotics champion".into();
  updated.created_at = Utc::now() + chrono::TimeDelta::days(1);
  assert_eq!(s.replace_document(updated).await.unwrap(), 1);

  let stored = s.get_document(&r.document_id).await.unwrap().unwrap();
  assert_eq!(stored.title, "Robotics champion");
  assert_eq!(stored.created_at, original.created_at);

  assert_eq!(s.soft_delete_document(&r.document_id, Utc::now()).await.unwrap(), 1);
  assert_eq!(s.replace_document(stored).await.unwrap(), 0);
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn advisees_are_listed_by_advisor() {
  let s = MemoryStore::new();
  let advisor = s.add_advisor(Uuid::new_v4(), "Dr. Budi");
  let a = s.add_student(Uuid::new_v4(), "Ayu", Some(advisor.id));
  s.add_student(Uuid::new_v4(), "Citra", None);

  let advisees = s.list_advisees(advisor.id).await.unwrap();
  assert_eq!(advisees.len(), 1);
  assert_eq!(advisees[0].id, a.id);

  let by_user = s.get_student_by_user(a.user_id).await.unwrap().unwrap();
  assert_eq!(by_user.id, a.id);
  let adv = s.get_advisor_by_user(advisor.user_id).await.unwrap().unwrap();
  assert_eq!(adv.id, advisor.id);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn notifications_are_recorded_until_delivery_fails() {
  let s = MemoryStore::new();
  let n = Notification::verified(Uuid::new_v4(), "Hackathon", Uuid::new_v4());

  s.notify(n.clone()).await.unwrap();
  s.set_notifications_offline(true);
  assert!(matches!(s.notify(n.clone()).await, Err(Error::DeliveryFailed)));

  assert_eq!(s.notifications(), vec![n]);
}
