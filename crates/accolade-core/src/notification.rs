//! Notifications emitted by lifecycle transitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  AchievementSubmitted,
  AchievementVerified,
  AchievementRejected,
}

impl NotificationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::AchievementSubmitted => "achievement_submitted",
      Self::AchievementVerified => "achievement_verified",
      Self::AchievementRejected => "achievement_rejected",
    }
  }
}

/// A message for one user about one achievement reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  /// The receiving user (not the student or advisor profile).
  pub recipient:  Uuid,
  pub kind:       NotificationKind,
  pub title:      String,
  pub message:    String,
  /// The achievement reference this is about.
  pub related_id: Uuid,
}

impl Notification {
  /// Tell an advisor that one of their students is waiting on them.
  pub fn submitted(
    advisor_user: Uuid,
    student_name: &str,
    achievement_title: &str,
    reference: Uuid,
  ) -> Self {
    Self {
      recipient:  advisor_user,
      kind:       NotificationKind::AchievementSubmitted,
      title:      "New achievement awaiting verification".into(),
      message:    format!(
        "{student_name} submitted '{achievement_title}' for verification."
      ),
      related_id: reference,
    }
  }

  pub fn verified(student_user: Uuid, achievement_title: &str, reference: Uuid) -> Self {
    Self {
      recipient:  student_user,
      kind:       NotificationKind::AchievementVerified,
      title:      "Achievement verified".into(),
      message:    format!("Your achievement '{achievement_title}' has been verified."),
      related_id: reference,
    }
  }

  pub fn rejected(
    student_user: Uuid,
    achievement_title: &str,
    note: Option<&str>,
    reference: Uuid,
  ) -> Self {
    let reason = note.unwrap_or("no reason given");
    Self {
      recipient:  student_user,
      kind:       NotificationKind::AchievementRejected,
      title:      "Achievement rejected".into(),
      message:    format!(
        "Your achievement '{achievement_title}' was rejected. Reason: {reason}"
      ),
      related_id: reference,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejection_carries_the_reason() {
    let n = Notification::rejected(Uuid::nil(), "Regional debate", Some("incomplete"), Uuid::nil());
    assert_eq!(n.kind, NotificationKind::AchievementRejected);
    assert!(n.message.ends_with("Reason: incomplete"));

    let bare = Notification::rejected(Uuid::nil(), "Regional debate", None, Uuid::nil());
    assert!(bare.message.ends_with("Reason: no reason given"));
  }

  #[test]
  fn kind_serialises_as_snake_case() {
    let json = serde_json::to_value(NotificationKind::AchievementSubmitted).unwrap();
    assert_eq!(json, NotificationKind::AchievementSubmitted.as_str());
  }
}
