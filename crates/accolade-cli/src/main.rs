//! `accolade`, the operator tool for the Accolade achievement tracker.
//!
//! Reads `accolade.toml` (or the path given with `--config`) layered with
//! `ACCOLADE_*` environment variables.
//!
//! # Usage
//!
//! ```
//! accolade hash-password < password.txt
//! accolade issue-token --user <uuid> --role <uuid> --permission achievement.read
//! accolade inspect-token <token>
//! accolade demo
//! ```

mod demo;

use std::{path::PathBuf, sync::Arc, time::Duration};

use accolade_auth::{TokenService, hash_password};
use accolade_core::{clock::SystemClock, config::Settings, rbac::PermissionSet, subject::Subject};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Accolade achievement tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "accolade.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,

  /// Sign a session token.
  IssueToken {
    #[arg(long)]
    user:       Uuid,
    #[arg(long)]
    role:       Uuid,
    /// Permission name to embed; repeat for several.
    #[arg(long = "permission", value_name = "NAME")]
    permissions: Vec<String>,
    /// Lifetime in seconds (default: `token_ttl_secs`).
    #[arg(long)]
    ttl_secs:   Option<u64>,
  },

  /// Verify a token and print its claims.
  InspectToken { token: String },

  /// Run the submit → reject flow against an in-memory store.
  Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = load_settings(cli.config)?;

  match cli.command {
    Command::HashPassword => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
    }
    Command::IssueToken { user, role, permissions, ttl_secs } => {
      let tokens = token_service(&settings)?;
      let permissions: PermissionSet = permissions.into_iter().collect();
      let ttl = ttl_secs.map_or(tokens.session_ttl(), Duration::from_secs);
      let issued = tokens
        .issue(Subject::new(user, role), &permissions, ttl)
        .context("failed to sign token")?;
      tracing::info!(expires_at = %issued.expires_at(), "issued token");
      println!("{}", issued.token);
    }
    Command::InspectToken { token } => {
      let tokens = token_service(&settings)?;
      let claims = tokens.parse(&token).context("token rejected")?;
      println!("{}", serde_json::to_string_pretty(&claims)?);
    }
    Command::Demo => demo::run(&settings).await?,
  }

  Ok(())
}

fn load_settings(path: PathBuf) -> anyhow::Result<Settings> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("ACCOLADE"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise Settings")
}

fn token_service(settings: &Settings) -> anyhow::Result<TokenService> {
  let secret = settings
    .jwt_secret
    .as_deref()
    .filter(|s| !s.is_empty())
    .context("jwt_secret is not set (config file or ACCOLADE_JWT_SECRET)")?;
  Ok(TokenService::new(
    secret.as_bytes(),
    settings.token_ttl(),
    Arc::new(SystemClock),
  ))
}

/// Read one line from stdin as the password.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_config_file_yields_defaults() {
    let settings = load_settings(PathBuf::from("/nonexistent/accolade.toml")).unwrap();
    assert_eq!(settings.cache_ttl_secs, Settings::default().cache_ttl_secs);
    assert_eq!(settings.store_timeout(), Duration::from_secs(10));
  }

  #[test]
  fn token_commands_need_a_secret() {
    let settings = Settings { jwt_secret: Some(String::new()), ..Settings::default() };
    assert!(token_service(&settings).is_err());

    let settings = Settings { jwt_secret: Some("s3cret".into()), ..Settings::default() };
    assert!(token_service(&settings).is_ok());
  }
}
