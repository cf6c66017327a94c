//! Payload checks run before a document is written.

use accolade_core::{
  Error, Result,
  achievement::{AchievementKind, NewAchievement},
};

/// Reject `input` if it is missing required fields or carries impossible
/// values. Every problem found is reported, not just the first.
pub fn validate(input: &NewAchievement) -> Result<()> {
  let mut problems = Vec::new();

  if input.title.trim().is_empty() {
    problems.push("title is required".to_owned());
  }

  let required = match &input.kind {
    AchievementKind::Competition(d) => Some(("competition_name", &d.competition_name)),
    AchievementKind::Organization(d) => Some(("organization_name", &d.organization_name)),
    AchievementKind::Publication(d) => Some(("publication_title", &d.publication_title)),
    AchievementKind::Certification(d) => Some(("certification_name", &d.certification_name)),
    AchievementKind::Academic | AchievementKind::Other => None,
  };
  if let Some((field, value)) = required
    && value.trim().is_empty()
  {
    problems.push(format!("{field} is required for {}", input.kind.discriminant()));
  }

  if let AchievementKind::Organization(d) = &input.kind
    && let Some(period) = d.period
    && period.end < period.start
  {
    problems.push("period ends before it starts".to_owned());
  }

  if !input.points.is_finite() || input.points < 0.0 {
    problems.push(format!("points must be a non-negative number, got {}", input.points));
  }

  for (i, attachment) in input.attachments.iter().enumerate() {
    if attachment.file_name.trim().is_empty() || attachment.file_url.trim().is_empty() {
      problems.push(format!("attachment {i} needs a file name and url"));
    }
  }

  if problems.is_empty() {
    Ok(())
  } else {
    Err(Error::Validation(problems.join("; ")))
  }
}

#[cfg(test)]
mod tests {
  use accolade_core::{
    ErrorKind,
    achievement::{CompetitionDetails, NewAttachment, OrganizationDetails, Period},
  };
  use chrono::{TimeDelta, Utc};

  use super::*;

  fn competition(name: &str) -> AchievementKind {
    AchievementKind::Competition(CompetitionDetails {
      competition_name:  name.into(),
      competition_level: None,
      rank:              Some(1),
      medal_type:        None,
    })
  }

  #[test]
  fn minimal_input_is_valid() {
    validate(&NewAchievement::new("Dean's list", AchievementKind::Academic)).unwrap();
    validate(&NewAchievement::new("ICPC", competition("ICPC Asia"))).unwrap();
  }

  #[test]
  fn blank_title_rejected() {
    let err = validate(&NewAchievement::new("   ", AchievementKind::Other)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(err.to_string().contains("title is required"));
  }

  #[test]
  fn kind_specific_name_required() {
    let err = validate(&NewAchievement::new("ICPC", competition(""))).unwrap_err();
    assert!(err.to_string().contains("competition_name is required for competition"));
  }

  #[test]
  fn every_problem_is_reported() {
    let mut input = NewAchievement::new("", competition(""));
    input.points = -5.0;
    input.attachments.push(NewAttachment {
      file_name: "certificate.pdf".into(),
      file_url:  String::new(),
      file_type: "application/pdf".into(),
    });

    let message = validate(&input).unwrap_err().to_string();
    assert_eq!(message.matches("; ").count(), 3, "{message}");
  }

  #[test]
  fn inverted_period_rejected() {
    let start = Utc::now();
    let input = NewAchievement::new(
      "BEM",
      AchievementKind::Organization(OrganizationDetails {
        organization_name: "Student council".into(),
        position:          Some("Treasurer".into()),
        period:            Some(Period { start, end: start - TimeDelta::days(30) }),
      }),
    );
    assert!(validate(&input).unwrap_err().to_string().contains("period"));
  }

  #[test]
  fn non_finite_points_rejected() {
    let mut input = NewAchievement::new("x", AchievementKind::Other);
    input.points = f64::NAN;
    assert!(validate(&input).is_err());
  }
}
