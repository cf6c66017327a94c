//! Time source injected into every component that stamps or expires data.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use parking_lot::Mutex;

/// Supplies the current instant.
pub trait Clock: Send + Sync + 'static {
  fn now(&self) -> DateTime<Utc>;
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
  now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Arc::new(Mutex::new(start)) }
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock();
    *now = after(*now, by);
  }

  pub fn set(&self, at: DateTime<Utc>) { *self.now.lock() = at; }
}

/// Starts at the current time truncated to a whole second.
impl Default for ManualClock {
  fn default() -> Self { Self::new(Utc::now().trunc_subsecs(0)) }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> { *self.now.lock() }
}

/// `at + by`, saturating at the largest representable instant.
pub fn after(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
  TimeDelta::from_std(by)
    .ok()
    .and_then(|delta| at.checked_add_signed(delta))
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn manual_clock_clones_share_time() {
    let clock = ManualClock::default();
    let other = clock.clone();
    let start = clock.now();

    other.advance(Duration::from_secs(90));
    assert_eq!(clock.now() - start, TimeDelta::seconds(90));
  }

  #[test]
  fn manual_clock_starts_on_a_whole_second() {
    assert_eq!(ManualClock::default().now().timestamp_subsec_nanos(), 0);
  }

  #[test]
  fn after_saturates() {
    let far = after(Utc::now(), Duration::MAX);
    assert_eq!(far, DateTime::<Utc>::MAX_UTC);
  }
}
