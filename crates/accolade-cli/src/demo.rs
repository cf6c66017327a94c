//! `accolade demo`: an end-to-end run against `MemoryStore`.

use std::sync::Arc;

use accolade_auth::{
  AuthorizationService, Authenticator, Gate, PermissionCache, TokenService, hash_password,
};
use accolade_core::{
  ErrorKind,
  achievement::{AchievementKind, CompetitionDetails, CompetitionLevel, NewAchievement},
  clock::{SharedClock, SystemClock},
  config::Settings,
};
use accolade_lifecycle::AchievementLifecycle;
use accolade_store_memory::MemoryStore;
use anyhow::{Context as _, bail};
use tracing::info;
use uuid::Uuid;

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
  let store = Arc::new(MemoryStore::new());
  let clock: SharedClock = Arc::new(SystemClock);

  // ── Seed ──────────────────────────────────────────────────────────────
  let student_role = store.add_role(
    "Mahasiswa",
    "Student",
    &["achievement.read", "achievement.write", "achievement.submit"],
  );
  let advisor_role = store.add_role(
    "Dosen Wali",
    "Academic advisor",
    &["achievement.read", "achievement.verify"],
  );

  let password = "correct horse battery staple";
  let hash = hash_password(password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  let advisor_account = store.add_account("budi", &hash, advisor_role.id, true);
  let student_account = store.add_account("ayu", &hash, student_role.id, true);
  let advisor = store.add_advisor(advisor_account.id, "Dr. Budi Santoso");
  store.add_student(student_account.id, "Ayu Lestari", Some(advisor.id));

  // ── Services ──────────────────────────────────────────────────────────
  let cache = Arc::new(PermissionCache::new(settings.cache_ttl(), Arc::clone(&clock)));
  let sweeper = cache.spawn_sweeper(settings.sweep_interval());
  let authz = AuthorizationService::new(Arc::clone(&store), cache, settings.store_timeout());

  let secret = match settings.jwt_secret.as_deref() {
    Some(secret) if !secret.is_empty() => secret.to_owned(),
    _ => Uuid::new_v4().to_string(),
  };
  let tokens = Arc::new(TokenService::new(
    secret.as_bytes(),
    settings.token_ttl(),
    Arc::clone(&clock),
  ));
  let auth = Authenticator::new(
    Arc::clone(&store),
    authz.clone(),
    Arc::clone(&tokens),
    settings.store_timeout(),
  );
  let gate = Gate::new(Arc::clone(&tokens), authz);
  let lifecycle = AchievementLifecycle::new(
    Arc::clone(&store),
    Arc::clone(&store),
    clock,
    settings.store_timeout(),
  );

  // ── Student drafts and submits ────────────────────────────────────────
  let session = auth.login("ayu", password).await.context("student login")?;
  let header = format!("Bearer {}", session.token.token);
  let student = gate.authorize(&header, "achievement.write").await?;

  let input = NewAchievement::new(
    "ICPC Asia Jakarta Regional",
    AchievementKind::Competition(CompetitionDetails {
      competition_name:  "ICPC Asia Jakarta Regional".into(),
      competition_level: Some(CompetitionLevel::International),
      rank:              Some(3),
      medal_type:        Some("bronze".into()),
    }),
  );
  let created = lifecycle.create(student, input).await?;
  let reference_id = created.reference.id;
  lifecycle.submit(student, reference_id).await?;

  // ── Advisor rejects ───────────────────────────────────────────────────
  let session = auth.login("budi", password).await.context("advisor login")?;
  let header = format!("Bearer {}", session.token.token);
  let reviewer = gate.authorize(&header, "achievement.verify").await?;

  let pending = lifecycle.pending_for_advisor(reviewer).await?;
  info!(pending = pending.len(), "advisor inbox");
  lifecycle
    .reject(reviewer, reference_id, Some("incomplete".into()))
    .await?;

  match lifecycle.verify(reviewer, reference_id).await {
    Err(e) if e.kind() == ErrorKind::PreconditionFailed => {
      info!(error = %e, "verify after reject refused");
    }
    Err(e) => return Err(e.into()),
    Ok(_) => bail!("verify after reject unexpectedly succeeded"),
  }

  // ── Report ────────────────────────────────────────────────────────────
  let history = lifecycle.history(reference_id).await?;
  println!("{}", serde_json::to_string_pretty(&history)?);
  for notification in store.notifications() {
    println!("→ {}: {}", notification.kind.as_str(), notification.message);
  }

  sweeper.shutdown().await;
  Ok(())
}
