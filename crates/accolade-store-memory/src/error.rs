//! Error type for `accolade-store-memory`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Every call fails while the store is switched offline.
  #[error("store offline")]
  Offline,

  #[error("notification delivery failed")]
  DeliveryFailed,

  /// Injected failure of reference inserts.
  #[error("reference write rejected")]
  ReferenceWriteRejected,

  #[error("duplicate key: {0}")]
  Duplicate(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
