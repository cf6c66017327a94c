//! The achievement lifecycle: who may move an achievement between states,
//! and when.
//!
//! Permission checks happen before this layer (see `accolade-auth`). What is
//! enforced here is the relationship between the caller and the record:
//! students act on their own drafts, advisors decide on their own
//! advisees' submissions.

pub mod lifecycle;
pub mod validate;

pub use lifecycle::{Achievement, AchievementLifecycle};
pub use validate::validate;
