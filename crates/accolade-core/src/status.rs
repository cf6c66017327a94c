//! Lifecycle status of an achievement and the reference row that tracks it.
//!
//! The status moves along a fixed graph:
//!
//! ```text
//! draft ──submit──▶ submitted ──verify──▶ verified
//!   │                   └──────reject───▶ rejected
//!   └──delete──▶ (soft-deleted draft)
//! ```
//!
//! Soft deletion is orthogonal to status: a deleted reference stays `draft`
//! with its `is_deleted` flag set. `verified` and `rejected` are final.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, achievement::DocumentId};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
  Draft,
  Submitted,
  Verified,
  Rejected,
}

impl AchievementStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Submitted => "submitted",
      Self::Verified => "verified",
      Self::Rejected => "rejected",
    }
  }

  /// No transition leaves a final status.
  pub fn is_final(self) -> bool { matches!(self, Self::Verified | Self::Rejected) }

  pub fn permits(self, transition: Transition) -> bool { self == transition.source() }
}

impl fmt::Display for AchievementStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for AchievementStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "draft" => Ok(Self::Draft),
      "submitted" => Ok(Self::Submitted),
      "verified" => Ok(Self::Verified),
      "rejected" => Ok(Self::Rejected),
      other => Err(Error::Validation(format!("unknown status: {other:?}"))),
    }
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// An edge of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  Submit,
  Verify,
  Reject,
  Delete,
}

impl Transition {
  /// The only status this transition may start from.
  pub fn source(self) -> AchievementStatus {
    match self {
      Self::Submit | Self::Delete => AchievementStatus::Draft,
      Self::Verify | Self::Reject => AchievementStatus::Submitted,
    }
  }

  /// The status after the transition. Deletion does not change status.
  pub fn target(self) -> AchievementStatus {
    match self {
      Self::Submit => AchievementStatus::Submitted,
      Self::Verify => AchievementStatus::Verified,
      Self::Reject => AchievementStatus::Rejected,
      Self::Delete => AchievementStatus::Draft,
    }
  }
}

// ─── Reference ───────────────────────────────────────────────────────────────

/// The relational row tracking one achievement's lifecycle. It points at the
/// document rather than duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementReference {
  pub id:             Uuid,
  /// Set at creation; never changes.
  pub student_id:     Uuid,
  pub document_id:    DocumentId,
  pub status:         AchievementStatus,
  pub submitted_at:   Option<DateTime<Utc>>,
  /// When the advisor verified or rejected.
  pub verified_at:    Option<DateTime<Utc>>,
  pub verified_by:    Option<Uuid>,
  pub rejection_note: Option<String>,
  pub is_deleted:     bool,
  pub deleted_at:     Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl AchievementReference {
  /// A fresh draft pointing at `document_id`.
  pub fn draft(student_id: Uuid, document_id: DocumentId, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      student_id,
      document_id,
      status: AchievementStatus::Draft,
      submitted_at: None,
      verified_at: None,
      verified_by: None,
      rejection_note: None,
      is_deleted: false,
      deleted_at: None,
      created_at: now,
      updated_at: now,
    }
  }

  /// Apply `change` in memory. Stores call this after matching
  /// `change.from` so every backend stamps the same columns.
  pub fn apply(&mut self, change: &StatusChange) {
    self.status = change.to;
    self.updated_at = change.at;
    match change.to {
      AchievementStatus::Submitted => self.submitted_at = Some(change.at),
      AchievementStatus::Verified | AchievementStatus::Rejected => {
        self.verified_at = Some(change.at);
        self.verified_by = change.verified_by;
        self.rejection_note = change.rejection_note.clone();
      }
      AchievementStatus::Draft => {}
    }
  }

  /// The status timeline recoverable from this row's timestamps.
  pub fn history(&self) -> Vec<StatusEvent> {
    let mut events = vec![StatusEvent {
      status: AchievementStatus::Draft,
      at:     self.created_at,
      actor:  None,
      note:   None,
    }];

    if let Some(at) = self.submitted_at {
      events.push(StatusEvent {
        status: AchievementStatus::Submitted,
        at,
        actor: None,
        note: None,
      });
    }

    if self.status.is_final()
      && let Some(at) = self.verified_at
    {
      events.push(StatusEvent {
        status: self.status,
        at,
        actor: self.verified_by,
        note: self.rejection_note.clone(),
      });
    }

    events
  }
}

/// A conditional status write: applies only while the row is still `from`
/// and not soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
  pub from:           AchievementStatus,
  pub to:             AchievementStatus,
  pub at:             DateTime<Utc>,
  pub verified_by:    Option<Uuid>,
  pub rejection_note: Option<String>,
}

impl StatusChange {
  pub fn submit(at: DateTime<Utc>) -> Self { Self::plain(Transition::Submit, at) }

  pub fn verify(by: Uuid, at: DateTime<Utc>) -> Self {
    Self { verified_by: Some(by), ..Self::plain(Transition::Verify, at) }
  }

  pub fn reject(by: Uuid, note: Option<String>, at: DateTime<Utc>) -> Self {
    Self {
      verified_by: Some(by),
      rejection_note: note,
      ..Self::plain(Transition::Reject, at)
    }
  }

  fn plain(transition: Transition, at: DateTime<Utc>) -> Self {
    Self {
      from: transition.source(),
      to: transition.target(),
      at,
      verified_by: None,
      rejection_note: None,
    }
  }
}

/// One entry of a reference's status timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
  pub status: AchievementStatus,
  pub at:     DateTime<Utc>,
  /// Who made the change, when recorded.
  pub actor:  Option<Uuid>,
  pub note:   Option<String>,
}
