//! [`AchievementLifecycle`]: the draft → submitted → verified/rejected state
//! machine.
//!
//! Every status change is one conditional write against the reference row.
//! If another request got there first the write touches nothing and the
//! caller sees a precondition failure; there is no lock held across calls.
//! Notifications go out after the write commits and are best-effort.

use std::{future::Future, sync::Arc, time::Duration};

use accolade_core::{
  Error, Result,
  achievement::{AchievementDocument, NewAchievement},
  clock::SharedClock,
  deadline::bounded,
  notification::Notification,
  status::{AchievementReference, AchievementStatus, StatusChange, StatusEvent, Transition},
  store::{AchievementStore, NotificationSink},
  subject::Subject,
  user::{Advisor, Student},
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::validate::validate;

/// A reference together with the document it points at.
#[derive(Debug, Clone, Serialize)]
pub struct Achievement {
  pub reference: AchievementReference,
  pub document:  AchievementDocument,
}

pub struct AchievementLifecycle<S, N> {
  store:         Arc<S>,
  notifier:      Arc<N>,
  clock:         SharedClock,
  store_timeout: Duration,
}

impl<S, N> Clone for AchievementLifecycle<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      notifier:      Arc::clone(&self.notifier),
      clock:         Arc::clone(&self.clock),
      store_timeout: self.store_timeout,
    }
  }
}

impl<S, N> AchievementLifecycle<S, N>
where
  S: AchievementStore,
  N: NotificationSink,
{
  pub fn new(store: Arc<S>, notifier: Arc<N>, clock: SharedClock, store_timeout: Duration) -> Self {
    Self { store, notifier, clock, store_timeout }
  }

  // ── Transitions ───────────────────────────────────────────────────────

  /// Store a new draft owned by the calling student.
  ///
  /// The document is written first. If the reference write then fails the
  /// document is removed again and the reference error is returned.
  pub async fn create(&self, caller: Subject, input: NewAchievement) -> Result<Achievement> {
    validate(&input)?;
    let student = self.student_for(caller).await?;

    let now = self.clock.now();
    let mut document = input.into_document(student.id, now);
    document.id = self
      .call("create achievement document", self.store.create_document(document.clone()))
      .await?;

    let reference = AchievementReference::draft(student.id, document.id.clone(), now);
    if let Err(e) = self
      .call("create achievement reference", self.store.create_reference(reference.clone()))
      .await
    {
      match self
        .call("remove orphaned document", self.store.delete_document(&document.id))
        .await
      {
        Ok(()) => debug!(document_id = %document.id, "removed orphaned document"),
        Err(cleanup) => warn!(
          document_id = %document.id,
          error = %cleanup,
          "failed to remove orphaned document"
        ),
      }
      return Err(e);
    }

    info!(reference_id = %reference.id, student_id = %student.id, "achievement drafted");
    Ok(Achievement { reference, document })
  }

  /// Hand a draft to the student's advisor for verification.
  pub async fn submit(&self, caller: Subject, reference_id: Uuid) -> Result<AchievementReference> {
    let student = self.student_for(caller).await?;
    let mut reference = self.owned_draft(caller, &student, reference_id).await?;

    let change = StatusChange::submit(self.clock.now());
    self.commit(&mut reference, change).await?;
    info!(reference_id = %reference.id, student_id = %student.id, "achievement submitted");

    match student.advisor_id {
      Some(advisor_id) => {
        let title = self.title_of(&reference).await;
        match self
          .call("load advisor", self.store.get_advisor(advisor_id))
          .await
        {
          Ok(Some(advisor)) => {
            let notification =
              Notification::submitted(advisor.user_id, &student.full_name, &title, reference.id);
            self.notify(notification).await;
          }
          Ok(None) => warn!(%advisor_id, "advisor of record not found; not notified"),
          Err(e) => warn!(%advisor_id, error = %e, "could not load advisor; not notified"),
        }
      }
      None => info!(student_id = %student.id, "student has no advisor; nobody notified"),
    }

    Ok(reference)
  }

  /// Accept a submitted achievement. Only the student's advisor of record
  /// may do this.
  pub async fn verify(&self, caller: Subject, reference_id: Uuid) -> Result<AchievementReference> {
    let (mut reference, advisor, student) = self.pending_decision(caller, reference_id).await?;

    let change = StatusChange::verify(caller.user_id, self.clock.now());
    self.commit(&mut reference, change).await?;
    info!(reference_id = %reference.id, advisor_id = %advisor.id, "achievement verified");

    let title = self.title_of(&reference).await;
    self
      .notify(Notification::verified(student.user_id, &title, reference.id))
      .await;
    Ok(reference)
  }

  /// Turn down a submitted achievement, optionally saying why. Only the
  /// student's advisor of record may do this.
  pub async fn reject(
    &self,
    caller: Subject,
    reference_id: Uuid,
    note: Option<String>,
  ) -> Result<AchievementReference> {
    let (mut reference, advisor, student) = self.pending_decision(caller, reference_id).await?;

    let note = note.filter(|n| !n.trim().is_empty());
    let change = StatusChange::reject(caller.user_id, note, self.clock.now());
    self.commit(&mut reference, change).await?;
    info!(reference_id = %reference.id, advisor_id = %advisor.id, "achievement rejected");

    let title = self.title_of(&reference).await;
    let notification = Notification::rejected(
      student.user_id,
      &title,
      reference.rejection_note.as_deref(),
      reference.id,
    );
    self.notify(notification).await;
    Ok(reference)
  }

  /// Soft-delete a draft and its document.
  ///
  /// The reference is deleted first. A failure on the document afterwards
  /// is returned, but the reference stays deleted.
  pub async fn delete(&self, caller: Subject, reference_id: Uuid) -> Result<()> {
    let student = self.student_for(caller).await?;
    let reference = self.owned_draft(caller, &student, reference_id).await?;

    let now = self.clock.now();
    let touched = self
      .call("delete achievement reference", self.store.soft_delete_reference(reference.id, now))
      .await?;
    if touched == 0 {
      // Lost a race; report what the row looks like now.
      let current = self.reference(reference.id).await?;
      return Err(if current.is_deleted {
        Error::AlreadyDeleted(reference.id)
      } else if current.status != AchievementStatus::Draft {
        Error::InvalidStatus {
          reference: reference.id,
          expected:  AchievementStatus::Draft,
          actual:    current.status,
        }
      } else {
        Error::StaleStatus { reference: reference.id, expected: AchievementStatus::Draft }
      });
    }

    let touched = self
      .call(
        "delete achievement document",
        self.store.soft_delete_document(&reference.document_id, now),
      )
      .await?;
    if touched == 0 {
      debug!(document_id = %reference.document_id, "document was already deleted");
    }

    info!(reference_id = %reference.id, student_id = %student.id, "achievement deleted");
    Ok(())
  }

  /// Replace the payload of a draft.
  ///
  /// The status is checked before the document is replaced, not atomically
  /// with it: an update racing a submit can land just after the submit.
  pub async fn update_draft(
    &self,
    caller: Subject,
    reference_id: Uuid,
    input: NewAchievement,
  ) -> Result<Achievement> {
    validate(&input)?;
    let student = self.student_for(caller).await?;
    let reference = self.owned_draft(caller, &student, reference_id).await?;
    let existing = self.document(&reference).await?;

    let mut document = input.into_document(student.id, self.clock.now());
    document.id = existing.id.clone();
    document.created_at = existing.created_at;

    let touched = self
      .call("replace achievement document", self.store.replace_document(document.clone()))
      .await?;
    if touched == 0 {
      return Err(Error::DocumentNotFound(existing.id));
    }

    info!(reference_id = %reference.id, "draft updated");
    Ok(Achievement { reference, document })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// A live reference with its document.
  pub async fn view(&self, reference_id: Uuid) -> Result<Achievement> {
    let reference = self.reference(reference_id).await?;
    if reference.is_deleted {
      return Err(Error::ReferenceNotFound(reference_id));
    }
    let document = self.document(&reference).await?;
    Ok(Achievement { reference, document })
  }

  /// The calling student's live references, newest first.
  pub async fn list_for_student(&self, caller: Subject) -> Result<Vec<AchievementReference>> {
    let student = self.student_for(caller).await?;
    self
      .call("list achievements", self.store.list_references_for_student(student.id))
      .await
  }

  /// Submitted references of every advisee of the calling advisor, oldest
  /// submission first.
  pub async fn pending_for_advisor(&self, caller: Subject) -> Result<Vec<AchievementReference>> {
    let advisor = self.advisor_for(caller).await?;
    let advisees = self
      .call("list advisees", self.store.list_advisees(advisor.id))
      .await?;

    let mut pending = Vec::new();
    for student in advisees {
      let references = self
        .call("list achievements", self.store.list_references_for_student(student.id))
        .await?;
      pending.extend(
        references
          .into_iter()
          .filter(|r| r.status == AchievementStatus::Submitted),
      );
    }
    pending.sort_by_key(|r| r.submitted_at);
    Ok(pending)
  }

  /// The status timeline of a reference.
  pub async fn history(&self, reference_id: Uuid) -> Result<Vec<StatusEvent>> {
    let reference = self.reference(reference_id).await?;
    if reference.is_deleted {
      return Err(Error::ReferenceNotFound(reference_id));
    }
    Ok(reference.history())
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn call<T, E>(
    &self,
    what: &'static str,
    fut: impl Future<Output = std::result::Result<T, E>>,
  ) -> Result<T>
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    bounded(what, self.store_timeout, fut).await
  }

  async fn student_for(&self, caller: Subject) -> Result<Student> {
    self
      .call("load student", self.store.get_student_by_user(caller.user_id))
      .await?
      .ok_or(Error::StudentNotFound(caller.user_id))
  }

  async fn advisor_for(&self, caller: Subject) -> Result<Advisor> {
    self
      .call("load advisor", self.store.get_advisor_by_user(caller.user_id))
      .await?
      .ok_or(Error::AdvisorNotFound(caller.user_id))
  }

  async fn reference(&self, reference_id: Uuid) -> Result<AchievementReference> {
    self
      .call("load achievement reference", self.store.get_reference(reference_id))
      .await?
      .ok_or(Error::ReferenceNotFound(reference_id))
  }

  async fn document(&self, reference: &AchievementReference) -> Result<AchievementDocument> {
    self
      .call("load achievement document", self.store.get_document(&reference.document_id))
      .await?
      .filter(|doc| !doc.is_deleted)
      .ok_or_else(|| Error::DocumentNotFound(reference.document_id.clone()))
  }

  /// A live draft owned by `student`.
  async fn owned_draft(
    &self,
    caller: Subject,
    student: &Student,
    reference_id: Uuid,
  ) -> Result<AchievementReference> {
    let reference = self.reference(reference_id).await?;
    if reference.student_id != student.id {
      return Err(Error::NotOwner { caller: caller.user_id, reference: reference_id });
    }
    if reference.is_deleted {
      return Err(Error::AlreadyDeleted(reference_id));
    }
    expect_status(&reference, Transition::Submit.source())?;
    Ok(reference)
  }

  /// A submitted reference the caller advises on, with both parties.
  ///
  /// Status is checked before the caller, so a reference that is not
  /// awaiting a decision fails the same way for everyone.
  async fn pending_decision(
    &self,
    caller: Subject,
    reference_id: Uuid,
  ) -> Result<(AchievementReference, Advisor, Student)> {
    let reference = self.reference(reference_id).await?;
    if reference.is_deleted {
      return Err(Error::ReferenceNotFound(reference_id));
    }
    expect_status(&reference, Transition::Verify.source())?;

    let advisor = self.advisor_for(caller).await?;
    let student = self
      .call("load student", self.store.get_student(reference.student_id))
      .await?
      .ok_or(Error::StudentNotFound(reference.student_id))?;
    if student.advisor_id != Some(advisor.id) {
      return Err(Error::NotAdvisor { caller: caller.user_id, reference: reference_id });
    }
    Ok((reference, advisor, student))
  }

  /// Write `change` conditionally and mirror it onto `reference`.
  async fn commit(&self, reference: &mut AchievementReference, change: StatusChange) -> Result<()> {
    let touched = self
      .call(
        "update achievement status",
        self.store.update_reference_status(reference.id, change.clone()),
      )
      .await?;
    if touched == 0 {
      return Err(Error::StaleStatus { reference: reference.id, expected: change.from });
    }
    reference.apply(&change);
    Ok(())
  }

  /// The document title for messages, or a placeholder if it cannot be read.
  async fn title_of(&self, reference: &AchievementReference) -> String {
    match self.document(reference).await {
      Ok(doc) => doc.title,
      Err(e) => {
        warn!(reference_id = %reference.id, error = %e, "could not load title for notification");
        "untitled achievement".to_owned()
      }
    }
  }

  /// Deliver `notification`, logging instead of failing.
  async fn notify(&self, notification: Notification) {
    let kind = notification.kind.as_str();
    let recipient = notification.recipient;
    match self
      .call("send notification", self.notifier.notify(notification))
      .await
    {
      Ok(()) => debug!(kind, %recipient, "notification sent"),
      Err(e) => warn!(kind, %recipient, error = %e, "notification failed"),
    }
  }
}

fn expect_status(reference: &AchievementReference, expected: AchievementStatus) -> Result<()> {
  if reference.status == expected {
    Ok(())
  } else {
    Err(Error::InvalidStatus { reference: reference.id, expected, actual: reference.status })
  }
}
