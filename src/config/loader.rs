//! Configuration Loader - File Loading, Env Overrides, Validation
//!
//! Loads `config.toml` when present, falls back to defaults when not
//! (the service historically ran from env vars alone), applies env
//! overrides, and validates the result with clear error messages.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{AppConfig, StorageBackend};

/// Load, override and validate configuration.
///
/// # Errors
/// Returns detailed error if:
/// - An existing config file can't be read or parsed
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let mut config: AppConfig = if path.exists() {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| "Failed to parse config.toml")?
  } else {
    AppConfig::default()
  };

  apply_env_overrides(&mut config)?;
  validate_config(&config)?;

  Ok(config)
}

/// Apply the env vars the desk's deployments set.
///
/// `DATABASE_URL` both provides the connection string and switches the
/// backend to postgres, mirroring the original deployment behavior.
fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
  if let Ok(url) = std::env::var("DATABASE_URL") {
    if !url.is_empty() {
      config.storage.database_url = Some(url);
      config.storage.backend = StorageBackend::Postgres;
      info!("DATABASE_URL set, using postgres backend");
    }
  }
  if let Ok(secret) = std::env::var("API_HMAC_SECRET") {
    if !secret.is_empty() {
      config.auth.secret = Some(secret);
    }
  }
  if let Ok(skew) = std::env::var("API_HMAC_MAX_SKEW_SECONDS") {
    config.auth.max_skew_seconds = skew
      .parse()
      .context("API_HMAC_MAX_SKEW_SECONDS must be an integer")?;
  }
  if let Ok(url) = std::env::var("WEBHOOK_URL") {
    if !url.is_empty() {
      config.webhook.url = Some(url);
    }
  }
  Ok(())
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.service.bind_address.is_empty(),
    "service.bind_address must not be empty"
  );
  anyhow::ensure!(
    config.auth.max_skew_seconds > 0,
    "auth.max_skew_seconds must be positive, got {}",
    config.auth.max_skew_seconds
  );
  anyhow::ensure!(
    config.webhook.timeout_ms > 0,
    "webhook.timeout_ms must be positive"
  );

  match config.storage.backend {
    StorageBackend::File => {
      anyhow::ensure!(
        !config.storage.data_dir.is_empty(),
        "storage.data_dir must not be empty for the file backend"
      );
    }
    StorageBackend::Postgres => {
      anyhow::ensure!(
        config
          .storage
          .database_url
          .as_ref()
          .is_some_and(|u| !u.is_empty()),
        "storage.database_url (or DATABASE_URL) required for the postgres backend"
      );
    }
  }

  Ok(())
}
