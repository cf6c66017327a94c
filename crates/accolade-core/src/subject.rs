//! The authenticated principal behind a request.
//!
//! A subject carries only identity. Its permission set is derived from the
//! role and cached separately; see `accolade-auth`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is asking, and under which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
  pub user_id: Uuid,
  pub role_id: Uuid,
}

impl Subject {
  pub fn new(user_id: Uuid, role_id: Uuid) -> Self { Self { user_id, role_id } }
}
