//! Achievement documents: the full payload kept in the document store.
//!
//! A document has no lifecycle of its own. Its status lives on the
//! [`AchievementReference`](crate::status::AchievementReference) that points at
//! it, and the document is only ever reached through that reference.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque identifier assigned by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Type-specific details ───────────────────────────────────────────────────

/// Reach of a competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionLevel {
  International,
  National,
  Regional,
  Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionDetails {
  pub competition_name:  String,
  pub competition_level: Option<CompetitionLevel>,
  /// Final placing, 1 being first.
  pub rank:              Option<u32>,
  pub medal_type:        Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationType {
  Journal,
  Conference,
  Book,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationDetails {
  pub publication_type:  Option<PublicationType>,
  pub publication_title: String,
  pub authors:           Vec<String>,
  pub publisher:         Option<String>,
  pub issn:              Option<String>,
}

/// A closed date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDetails {
  pub organization_name: String,
  pub position:          Option<String>,
  pub period:            Option<Period>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationDetails {
  pub certification_name:   String,
  pub issued_by:            Option<String>,
  pub certification_number: Option<String>,
  pub valid_until:          Option<DateTime<Utc>>,
}

/// The kind of an achievement together with the fields only that kind has.
/// The variant name is the `type` discriminant seen by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum AchievementKind {
  Academic,
  Competition(CompetitionDetails),
  Organization(OrganizationDetails),
  Publication(PublicationDetails),
  Certification(CertificationDetails),
  Other,
}

impl AchievementKind {
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Academic => "academic",
      Self::Competition(_) => "competition",
      Self::Organization(_) => "organization",
      Self::Publication(_) => "publication",
      Self::Certification(_) => "certification",
      Self::Other => "other",
    }
  }
}

/// Optional fields any kind may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonDetails {
  pub event_date: Option<DateTime<Utc>>,
  pub location:   Option<String>,
  pub organizer:  Option<String>,
  pub score:      Option<f64>,
}

// ─── Attachments ─────────────────────────────────────────────────────────────

/// A supporting file. Only the pointer is stored; file storage is elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
  pub file_name:   String,
  pub file_url:    String,
  pub file_type:   String,
  pub uploaded_at: DateTime<Utc>,
}

// ─── Document ────────────────────────────────────────────────────────────────

/// The stored payload of one achievement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementDocument {
  pub id:            DocumentId,
  pub student_id:    Uuid,
  pub title:         String,
  pub description:   String,
  #[serde(flatten)]
  pub kind:          AchievementKind,
  pub common:        CommonDetails,
  /// Free-form extras a kind does not model.
  pub custom_fields: serde_json::Map<String, serde_json::Value>,
  pub attachments:   Vec<Attachment>,
  pub tags:          Vec<String>,
  pub points:        f64,
  pub is_deleted:    bool,
  pub deleted_at:    Option<DateTime<Utc>>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// An attachment as submitted by a client; the upload time is server-set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
  pub file_name: String,
  pub file_url:  String,
  pub file_type: String,
}

/// Input to achievement creation and draft updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAchievement {
  pub title:         String,
  #[serde(default)]
  pub description:   String,
  #[serde(flatten)]
  pub kind:          AchievementKind,
  #[serde(default)]
  pub common:        CommonDetails,
  #[serde(default)]
  pub custom_fields: serde_json::Map<String, serde_json::Value>,
  #[serde(default)]
  pub attachments:   Vec<NewAttachment>,
  #[serde(default)]
  pub tags:          Vec<String>,
  #[serde(default)]
  pub points:        f64,
}

impl NewAchievement {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(title: impl Into<String>, kind: AchievementKind) -> Self {
    Self {
      title: title.into(),
      description: String::new(),
      kind,
      common: CommonDetails::default(),
      custom_fields: serde_json::Map::new(),
      attachments: Vec::new(),
      tags: Vec::new(),
      points: 0.0,
    }
  }

  /// Materialise the document this input describes. `id` is a placeholder
  /// until the store assigns one.
  pub fn into_document(self, student_id: Uuid, now: DateTime<Utc>) -> AchievementDocument {
    AchievementDocument {
      id: DocumentId(String::new()),
      student_id,
      title: self.title,
      description: self.description,
      kind: self.kind,
      common: self.common,
      custom_fields: self.custom_fields,
      attachments: self
        .attachments
        .into_iter()
        .map(|a| Attachment {
          file_name:   a.file_name,
          file_url:    a.file_url,
          file_type:   a.file_type,
          uploaded_at: now,
        })
        .collect(),
      tags: self.tags,
      points: self.points,
      is_deleted: false,
      deleted_at: None,
      created_at: now,
      updated_at: now,
    }
  }
}
