//! Runtime settings consumed by the authorization and lifecycle services.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Deserialised from `accolade.toml` and `ACCOLADE_*` environment variables.
/// Every field has a default, so an empty source is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// How long a resolved permission set is served from cache.
  pub cache_ttl_secs:      u64,
  /// How often expired cache entries are evicted.
  pub sweep_interval_secs: u64,
  /// Lifetime of an issued session token.
  pub token_ttl_secs:      u64,
  /// Upper bound on any single store call.
  pub store_timeout_secs:  u64,
  /// HMAC secret for session tokens. Only token commands require it.
  pub jwt_secret:          Option<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      cache_ttl_secs:      5 * 60,
      sweep_interval_secs: 60,
      token_ttl_secs:      24 * 60 * 60,
      store_timeout_secs:  10,
      jwt_secret:          None,
    }
  }
}

impl Settings {
  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }

  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs)
  }

  pub fn token_ttl(&self) -> Duration { Duration::from_secs(self.token_ttl_secs) }

  pub fn store_timeout(&self) -> Duration {
    Duration::from_secs(self.store_timeout_secs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_source_yields_defaults() {
    let settings: Settings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
    assert_eq!(settings.sweep_interval(), Duration::from_secs(60));
    assert_eq!(settings.token_ttl(), Duration::from_secs(86_400));
  }

  #[test]
  fn partial_source_overrides_only_given_fields() {
    let settings: Settings =
      serde_json::from_str(r#"{"cache_ttl_secs": 30, "jwt_secret": "s3cret"}"#)
        .unwrap();
    assert_eq!(settings.cache_ttl(), Duration::from_secs(30));
    assert_eq!(settings.jwt_secret.as_deref(), Some("s3cret"));
    assert_eq!(settings.store_timeout_secs, 10);
  }
}
