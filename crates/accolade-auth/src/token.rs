//! Session tokens: HS256 JWTs carrying a permission snapshot.
//!
//! The permissions in a token are fixed when it is issued. A role change
//! takes effect for a token holder only once the token expires, is revoked
//! or is refreshed.
//!
//! `exp` has one-second resolution and is rounded up, so a token never
//! expires before its full lifetime has elapsed.

use std::{collections::HashMap, time::Duration};

use accolade_core::{
  Error, Result,
  clock::{self, SharedClock},
  rbac::PermissionSet,
  subject::Subject,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Default lifetime of a session token.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub:         Uuid,
  /// Role id.
  pub role:        Uuid,
  pub permissions: Vec<String>,
  /// Seconds since the epoch.
  pub iat:         i64,
  /// Seconds since the epoch.
  pub exp:         i64,
  pub jti:         Uuid,
}

impl Claims {
  pub fn subject(&self) -> Subject { Subject::new(self.sub, self.role) }

  pub fn permission_set(&self) -> PermissionSet { self.permissions.iter().cloned().collect() }

  pub fn issued_at(&self) -> DateTime<Utc> { from_timestamp(self.iat) }

  pub fn expires_at(&self) -> DateTime<Utc> { from_timestamp(self.exp) }
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
  DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn ceil_seconds(at: DateTime<Utc>) -> i64 {
  let secs = at.timestamp();
  if at.timestamp_subsec_nanos() > 0 { secs.saturating_add(1) } else { secs }
}

/// A freshly signed token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
  pub token:  String,
  pub claims: Claims,
}

impl IssuedToken {
  pub fn expires_at(&self) -> DateTime<Utc> { self.claims.expires_at() }
}

pub struct TokenService {
  encoding:    EncodingKey,
  decoding:    DecodingKey,
  validation:  Validation,
  session_ttl: Duration,
  clock:       SharedClock,
  /// jti → exp of revoked, not yet expired tokens.
  revoked:     Mutex<HashMap<Uuid, i64>>,
}

impl TokenService {
  pub fn new(secret: &[u8], session_ttl: Duration, clock: SharedClock) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked against the injected clock in `parse`.
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      session_ttl,
      clock,
      revoked: Mutex::new(HashMap::new()),
    }
  }

  pub fn session_ttl(&self) -> Duration { self.session_ttl }

  /// Sign a token for `subject` holding `permissions`, valid for `ttl`.
  pub fn issue(
    &self,
    subject: Subject,
    permissions: &PermissionSet,
    ttl: Duration,
  ) -> Result<IssuedToken> {
    let now = self.clock.now();
    let claims = Claims {
      sub:         subject.user_id,
      role:        subject.role_id,
      permissions: permissions.to_vec(),
      iat:         now.timestamp(),
      exp:         ceil_seconds(clock::after(now, ttl)),
      jti:         Uuid::new_v4(),
    };

    let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| Error::unavailable("sign token", e))?;

    debug!(user_id = %claims.sub, jti = %claims.jti, exp = claims.exp, "issued token");
    Ok(IssuedToken { token, claims })
  }

  /// [`issue`](Self::issue) with the configured session lifetime.
  pub fn issue_session(&self, subject: Subject, permissions: &PermissionSet) -> Result<IssuedToken> {
    self.issue(subject, permissions, self.session_ttl)
  }

  /// Verify the signature and expiry of `token` and return its claims.
  pub fn parse(&self, token: &str) -> Result<Claims> {
    let claims = decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|e| Error::InvalidToken(e.to_string()))?
      .claims;

    if self.clock.now() >= claims.expires_at() {
      return Err(Error::TokenExpired(claims.expires_at()));
    }
    if self.revoked.lock().contains_key(&claims.jti) {
      return Err(Error::InvalidToken("token revoked".to_owned()));
    }
    Ok(claims)
  }

  /// Reject the token carrying `claims` from now until it expires.
  ///
  /// Returns `false` if the token was already revoked or has expired.
  pub fn revoke(&self, claims: &Claims) -> bool {
    let now = self.clock.now().timestamp();
    let mut revoked = self.revoked.lock();
    revoked.retain(|_, exp| *exp > now);
    if claims.exp <= now {
      return false;
    }
    let fresh = revoked.insert(claims.jti, claims.exp).is_none();
    if fresh {
      info!(user_id = %claims.sub, jti = %claims.jti, "revoked token");
    }
    fresh
  }

  /// Parse `token` and revoke it. Used for logout.
  pub fn invalidate_session(&self, token: &str) -> Result<()> {
    let claims = self.parse(token)?;
    self.revoke(&claims);
    Ok(())
  }

  /// Number of revocations still being tracked.
  pub fn revoked_count(&self) -> usize { self.revoked.lock().len() }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use accolade_core::{ErrorKind, clock::ManualClock};

  use super::*;

  fn service(clock: &ManualClock) -> TokenService {
    TokenService::new(b"test-secret", DEFAULT_SESSION_TTL, Arc::new(clock.clone()))
  }

  fn perms() -> PermissionSet { ["achievement.read", "achievement.write"].into_iter().collect() }

  #[test]
  fn round_trip_before_expiry() {
    let clock = ManualClock::default();
    let tokens = service(&clock);
    let subject = Subject::new(Uuid::new_v4(), Uuid::new_v4());

    let issued = tokens.issue(subject, &perms(), Duration::from_secs(3600)).unwrap();
    clock.advance(Duration::from_secs(3599));

    let claims = tokens.parse(&issued.token).unwrap();
    assert_eq!(claims.subject(), subject);
    assert_eq!(claims.permission_set(), perms());
    assert_eq!(claims, issued.claims);
  }

  #[test]
  fn expired_after_ttl() {
    let clock = ManualClock::default();
    let tokens = service(&clock);
    let subject = Subject::new(Uuid::new_v4(), Uuid::new_v4());

    let issued = tokens.issue(subject, &perms(), Duration::from_secs(3600)).unwrap();
    clock.advance(Duration::from_secs(3600));

    let err = tokens.parse(&issued.token).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);
  }

  #[test]
  fn session_uses_configured_ttl() {
    let clock = ManualClock::default();
    let tokens = service(&clock);
    let issued = tokens
      .issue_session(Subject::new(Uuid::new_v4(), Uuid::new_v4()), &PermissionSet::empty())
      .unwrap();
    assert_eq!(issued.claims.exp - issued.claims.iat, 24 * 60 * 60);
  }

  #[test]
  fn fractional_start_gets_the_full_lifetime() {
    let start = DateTime::from_timestamp(1_700_000_000, 200_000_000).unwrap();
    let clock = ManualClock::new(start);
    let tokens = service(&clock);
    let subject = Subject::new(Uuid::new_v4(), Uuid::new_v4());

    let short = tokens.issue(subject, &perms(), Duration::from_millis(500)).unwrap();
    assert_eq!(tokens.parse(&short.token).unwrap(), short.claims);
    assert_eq!(short.claims.exp, 1_700_000_001);

    clock.set(DateTime::from_timestamp(1_700_000_000, 900_000_000).unwrap());
    let longer = tokens.issue(subject, &perms(), Duration::from_millis(1500)).unwrap();
    assert_eq!(longer.claims.exp, 1_700_000_003);

    // 1.1 s after the second issue the first token is gone, the second is not.
    clock.advance(Duration::from_millis(1100));
    assert_eq!(tokens.parse(&short.token).unwrap_err().kind(), ErrorKind::Expired);
    assert!(tokens.parse(&longer.token).is_ok());

    clock.advance(Duration::from_millis(1000));
    assert_eq!(tokens.parse(&longer.token).unwrap_err().kind(), ErrorKind::Expired);
  }

  #[test]
  fn revoking_twice_reports_once() {
    let clock = ManualClock::default();
    let tokens = service(&clock);
    let issued = tokens
      .issue_session(Subject::new(Uuid::new_v4(), Uuid::new_v4()), &perms())
      .unwrap();

    assert!(tokens.revoke(&issued.claims));
    assert!(!tokens.revoke(&issued.claims));
    assert_eq!(tokens.revoked_count(), 1);
  }

  #[test]
  fn foreign_signature_is_invalid() {
    let clock = ManualClock::default();
    let ours = service(&clock);
    let theirs = TokenService::new(b"other-secret", DEFAULT_SESSION_TTL, Arc::new(clock.clone()));
    let issued = theirs
      .issue_session(Subject::new(Uuid::new_v4(), Uuid::new_v4()), &perms())
      .unwrap();

    assert_eq!(ours.parse(&issued.token).unwrap_err().kind(), ErrorKind::InvalidToken);
    assert_eq!(ours.parse("not.a.jwt").unwrap_err().kind(), ErrorKind::InvalidToken);
    assert_eq!(ours.parse("").unwrap_err().kind(), ErrorKind::InvalidToken);
  }

  #[test]
  fn revoked_until_natural_expiry() {
    let clock = ManualClock::default();
    let tokens = service(&clock);
    let subject = Subject::new(Uuid::new_v4(), Uuid::new_v4());
    let issued = tokens.issue(subject, &perms(), Duration::from_secs(60)).unwrap();
    let other = tokens.issue(subject, &perms(), Duration::from_secs(600)).unwrap();

    tokens.invalidate_session(&issued.token).unwrap();
    assert_eq!(tokens.parse(&issued.token).unwrap_err().kind(), ErrorKind::InvalidToken);
    assert!(tokens.parse(&other.token).is_ok());

    // Revoking anything later prunes records of tokens that have expired.
    clock.advance(Duration::from_secs(61));
    tokens.revoke(&other.claims);
    assert_eq!(tokens.revoked_count(), 1);
    assert_eq!(tokens.parse(&issued.token).unwrap_err().kind(), ErrorKind::Expired);
  }
}
