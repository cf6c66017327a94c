//! User accounts and the academic profiles attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A login identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
  pub id:            Uuid,
  pub username:      String,
  pub email:         String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub full_name:     String,
  pub role_id:       Uuid,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
}

impl UserAccount {
  /// Logins accept either the username or the email address.
  pub fn matches_identifier(&self, identifier: &str) -> bool {
    self.username == identifier || self.email == identifier
  }
}

/// The student profile of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub id:             Uuid,
  pub user_id:        Uuid,
  /// Institutional student number.
  pub student_number: String,
  pub full_name:      String,
  pub program_study:  String,
  pub academic_year:  String,
  /// The lecturer who verifies this student's achievements, if assigned.
  pub advisor_id:     Option<Uuid>,
}

/// The lecturer profile of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advisor {
  pub id:              Uuid,
  pub user_id:         Uuid,
  pub lecturer_number: String,
  pub full_name:       String,
  pub department:      String,
}
