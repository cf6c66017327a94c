//! [`PermissionCache`]: a short-lived memo of resolved permission sets.
//!
//! Entries are keyed by user id and expire `ttl` after they were written.
//! Expiry is observed on every read, so a stale entry is never served even
//! if the sweeper has not run. The sweeper only reclaims memory.

use std::{
  collections::HashMap,
  sync::{Arc, Weak},
  time::Duration,
};

use accolade_core::{
  clock::{self, SharedClock},
  rbac::PermissionSet,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::{sync::broadcast, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

/// Default lifetime of an entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
  permissions: PermissionSet,
  expires_at:  DateTime<Utc>,
}

pub struct PermissionCache {
  entries: RwLock<HashMap<Uuid, CacheEntry>>,
  ttl:     Duration,
  clock:   SharedClock,
}

impl PermissionCache {
  pub fn new(ttl: Duration, clock: SharedClock) -> Self {
    Self { entries: RwLock::new(HashMap::new()), ttl, clock }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// The cached set for `user_id`, if present and not yet expired.
  pub fn get(&self, user_id: Uuid) -> Option<PermissionSet> {
    let now = self.clock.now();
    let entries = self.entries.read();
    entries
      .get(&user_id)
      .filter(|entry| now < entry.expires_at)
      .map(|entry| entry.permissions.clone())
  }

  /// Store `permissions` for `user_id`, replacing any previous entry and
  /// restarting its lifetime.
  pub fn set(&self, user_id: Uuid, permissions: PermissionSet) {
    let expires_at = clock::after(self.clock.now(), self.ttl);
    self
      .entries
      .write()
      .insert(user_id, CacheEntry { permissions, expires_at });
  }

  pub fn invalidate(&self, user_id: Uuid) {
    self.entries.write().remove(&user_id);
  }

  pub fn invalidate_all(&self) { self.entries.write().clear(); }

  /// Drop every expired entry. Returns how many were evicted.
  pub fn sweep(&self) -> usize {
    let now = self.clock.now();
    let mut entries = self.entries.write();
    let before = entries.len();
    entries.retain(|_, entry| now < entry.expires_at);
    before - entries.len()
  }

  /// Number of stored entries, expired ones included.
  pub fn len(&self) -> usize { self.entries.read().len() }

  pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }

  /// Run [`sweep`](Self::sweep) every `interval` on a tokio task until the
  /// returned handle is shut down or the cache is dropped.
  pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Sweeper {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    let cache: Weak<Self> = Arc::downgrade(self);
    let period = interval.max(Duration::from_millis(1));

    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        tokio::select! {
          _ = ticker.tick() => {
            let Some(cache) = cache.upgrade() else { break };
            let evicted = cache.sweep();
            if evicted > 0 {
              debug!(evicted, remaining = cache.len(), "swept permission cache");
            }
          }
          _ = shutdown_rx.recv() => {
            info!("permission cache sweeper stopping");
            break;
          }
        }
      }
    });

    Sweeper { shutdown_tx, handle }
  }
}

/// Handle to a running sweep task.
///
/// Dropping the handle also stops the task, but only [`shutdown`] waits for
/// it to finish.
///
/// [`shutdown`]: Sweeper::shutdown
pub struct Sweeper {
  shutdown_tx: broadcast::Sender<()>,
  handle:      JoinHandle<()>,
}

impl Sweeper {
  /// Signal the task and wait for it to exit.
  pub async fn shutdown(self) {
    let _ = self.shutdown_tx.send(());
    let _ = self.handle.await;
  }
}

#[cfg(test)]
mod tests {
  use accolade_core::clock::{ManualClock, SystemClock};

  use super::*;

  fn perms(names: &[&str]) -> PermissionSet { names.iter().copied().collect() }

  #[test]
  fn hit_before_expiry_miss_after() {
    let clock = ManualClock::default();
    let cache = PermissionCache::new(Duration::from_secs(300), Arc::new(clock.clone()));
    let user = Uuid::new_v4();

    cache.set(user, perms(&["achievement.read"]));
    clock.advance(Duration::from_secs(299));
    assert_eq!(cache.get(user), Some(perms(&["achievement.read"])));

    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.get(user), None);
    // Still stored until swept.
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn short_ttl_expires_on_the_read_path() {
    let cache = PermissionCache::new(Duration::from_millis(100), Arc::new(SystemClock));
    let user = Uuid::new_v4();

    cache.set(user, perms(&["p1"]));
    assert_eq!(cache.get(user), Some(perms(&["p1"])));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(cache.get(user), None);
  }

  #[test]
  fn set_restarts_lifetime() {
    let clock = ManualClock::default();
    let cache = PermissionCache::new(Duration::from_secs(60), Arc::new(clock.clone()));
    let user = Uuid::new_v4();

    cache.set(user, perms(&["a"]));
    clock.advance(Duration::from_secs(45));
    cache.set(user, perms(&["a", "b"]));
    clock.advance(Duration::from_secs(45));
    assert_eq!(cache.get(user), Some(perms(&["a", "b"])));
  }

  #[test]
  fn invalidation() {
    let cache = PermissionCache::new(DEFAULT_TTL, Arc::new(SystemClock));
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    cache.set(a, perms(&["x"]));
    cache.set(b, perms(&["y"]));

    cache.invalidate(a);
    assert_eq!(cache.get(a), None);
    assert!(cache.get(b).is_some());

    cache.invalidate_all();
    assert!(cache.is_empty());
  }

  #[test]
  fn sweep_removes_only_expired() {
    let clock = ManualClock::default();
    let cache = PermissionCache::new(Duration::from_secs(10), Arc::new(clock.clone()));
    let old = Uuid::new_v4();
    cache.set(old, perms(&["x"]));
    clock.advance(Duration::from_secs(8));
    let fresh = Uuid::new_v4();
    cache.set(fresh, perms(&["y"]));
    clock.advance(Duration::from_secs(2));

    assert_eq!(cache.sweep(), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(fresh).is_some());
  }

  #[tokio::test]
  async fn sweeper_runs_and_shuts_down() {
    let clock = ManualClock::default();
    let cache = Arc::new(PermissionCache::new(Duration::from_secs(1), Arc::new(clock.clone())));
    cache.set(Uuid::new_v4(), perms(&["x"]));
    clock.advance(Duration::from_secs(5));

    let sweeper = cache.spawn_sweeper(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.is_empty());

    sweeper.shutdown().await;
  }
}
