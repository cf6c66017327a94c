//! Error types for `accolade-core`.
//!
//! Every service in the workspace returns [`Error`]. The transport layer maps
//! [`Error::kind`] onto its own status codes; nothing below it does.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{achievement::DocumentId, status::AchievementStatus};

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  /// The caller has no ownership or advisor relationship with the record.
  Unauthorized,
  /// The caller is authenticated but lacks a permission or role.
  Forbidden,
  /// The record is not in the lifecycle state the operation requires.
  PreconditionFailed,
  ValidationFailed,
  /// A dependency failed or did not answer in time.
  Unavailable,
  InvalidToken,
  Expired,
}

#[derive(Debug, Error)]
pub enum Error {
  // ── Not found ──────────────────────────────────────────────────────────
  #[error("role not found: {0}")]
  RoleNotFound(Uuid),

  #[error("achievement reference not found: {0}")]
  ReferenceNotFound(Uuid),

  #[error("achievement document not found: {0}")]
  DocumentNotFound(DocumentId),

  #[error("no student profile for user {0}")]
  StudentNotFound(Uuid),

  #[error("no advisor profile for user {0}")]
  AdvisorNotFound(Uuid),

  // ── Relationship checks ────────────────────────────────────────────────
  #[error("user {caller} does not own achievement {reference}")]
  NotOwner { caller: Uuid, reference: Uuid },

  #[error("user {caller} is not the advisor of record for achievement {reference}")]
  NotAdvisor { caller: Uuid, reference: Uuid },

  #[error("invalid credentials")]
  InvalidCredentials,

  // ── Permission checks ──────────────────────────────────────────────────
  #[error("missing permission(s): {}", .missing.join(", "))]
  Forbidden { missing: Vec<String> },

  #[error("role {expected:?} required")]
  RoleRequired { expected: String },

  #[error("account {0} is inactive")]
  AccountInactive(Uuid),

  // ── Lifecycle preconditions ────────────────────────────────────────────
  #[error("achievement {reference} is {actual}, expected {expected}")]
  InvalidStatus {
    reference: Uuid,
    expected:  AchievementStatus,
    actual:    AchievementStatus,
  },

  /// The conditional write matched no row: another request moved the
  /// reference out of `expected` first.
  #[error("achievement {reference} is no longer {expected}")]
  StaleStatus {
    reference: Uuid,
    expected:  AchievementStatus,
  },

  #[error("achievement {0} is already deleted")]
  AlreadyDeleted(Uuid),

  #[error("invalid achievement: {0}")]
  Validation(String),

  // ── Dependencies ───────────────────────────────────────────────────────
  #[error("{context}: {source}")]
  Unavailable {
    context: String,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("{0} timed out after {1:?}")]
  TimedOut(&'static str, Duration),

  // ── Tokens ─────────────────────────────────────────────────────────────
  #[error("invalid token: {0}")]
  InvalidToken(String),

  #[error("token expired at {0}")]
  TokenExpired(DateTime<Utc>),
}

impl Error {
  /// Wrap a collaborator failure with a short description of the call.
  pub fn unavailable<E>(context: impl Into<String>, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Unavailable { context: context.into(), source: Box::new(source) }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::RoleNotFound(_)
      | Self::ReferenceNotFound(_)
      | Self::DocumentNotFound(_)
      | Self::StudentNotFound(_)
      | Self::AdvisorNotFound(_) => ErrorKind::NotFound,
      Self::NotOwner { .. } | Self::NotAdvisor { .. } | Self::InvalidCredentials => {
        ErrorKind::Unauthorized
      }
      Self::Forbidden { .. } | Self::RoleRequired { .. } | Self::AccountInactive(_) => {
        ErrorKind::Forbidden
      }
      Self::InvalidStatus { .. } | Self::StaleStatus { .. } | Self::AlreadyDeleted(_) => {
        ErrorKind::PreconditionFailed
      }
      Self::Validation(_) => ErrorKind::ValidationFailed,
      Self::Unavailable { .. } | Self::TimedOut(..) => ErrorKind::Unavailable,
      Self::InvalidToken(_) => ErrorKind::InvalidToken,
      Self::TokenExpired(_) => ErrorKind::Expired,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  #[error("connection refused")]
  struct Refused;

  #[test]
  fn unavailable_keeps_context_and_source() {
    let err = Error::unavailable("load role", Refused);
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert_eq!(err.to_string(), "load role: connection refused");
    assert!(std::error::Error::source(&err).is_some());
  }

  #[test]
  fn forbidden_lists_every_missing_permission() {
    let err = Error::Forbidden {
      missing: vec!["achievement.verify".into(), "report.read".into()],
    };
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(
      err.to_string(),
      "missing permission(s): achievement.verify, report.read"
    );
  }

  #[test]
  fn lifecycle_errors_are_preconditions() {
    let id = Uuid::new_v4();
    for err in [
      Error::AlreadyDeleted(id),
      Error::StaleStatus { reference: id, expected: AchievementStatus::Draft },
      Error::InvalidStatus {
        reference: id,
        expected:  AchievementStatus::Submitted,
        actual:    AchievementStatus::Verified,
      },
    ] {
      assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    }
  }
}
