//! Bounding collaborator calls.

use std::{future::Future, time::Duration};

use crate::{Error, Result};

/// Await `call`, failing with [`Error::TimedOut`] once `limit` elapses and
/// wrapping a collaborator error as [`Error::Unavailable`].
///
/// The inner future is dropped on timeout. Callers only pass single store
/// writes here, so a dropped call never leaves a half-applied transition.
pub async fn bounded<F, T, E>(what: &'static str, limit: Duration, call: F) -> Result<T>
where
  F: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(limit, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(Error::unavailable(what, e)),
    Err(_) => Err(Error::TimedOut(what, limit)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  #[derive(Debug, thiserror::Error)]
  #[error("disk on fire")]
  struct Boom;

  #[tokio::test]
  async fn passes_values_through() {
    let value = bounded("noop", Duration::from_secs(1), async {
      Ok::<_, Boom>(7)
    })
    .await
    .unwrap();
    assert_eq!(value, 7);
  }

  #[tokio::test]
  async fn wraps_collaborator_errors() {
    let err = bounded("load role", Duration::from_secs(1), async {
      Err::<(), _>(Boom)
    })
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert_eq!(err.to_string(), "load role: disk on fire");
  }

  #[tokio::test]
  async fn slow_calls_time_out() {
    let err = bounded("slow", Duration::from_millis(50), async {
      tokio::time::sleep(Duration::from_secs(5)).await;
      Ok::<_, Boom>(())
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::TimedOut("slow", _)));
    assert_eq!(err.kind(), ErrorKind::Unavailable);
  }
}
