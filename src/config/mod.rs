//! Configuration Module - TOML-based Service Configuration
//!
//! Loads configuration from `config.toml` with environment variable
//! overrides (`DATABASE_URL`, `API_HMAC_SECRET`,
//! `API_HMAC_MAX_SKEW_SECONDS`, `WEBHOOK_URL`), so the service also
//! runs from env vars alone with no config file present.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and HTTP binding.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Order storage backend selection.
  #[serde(default)]
  pub storage: StorageConfig,
  /// HMAC request authentication.
  #[serde(default)]
  pub auth: AuthConfig,
  /// Lifecycle webhook delivery.
  #[serde(default)]
  pub webhook: WebhookConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      service: ServiceConfig::default(),
      storage: StorageConfig::default(),
      auth: AuthConfig::default(),
      webhook: WebhookConfig::default(),
    }
  }
}

/// Service binding and logging.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// HTTP bind address.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      bind_address: default_bind_address(),
      log_level: default_log_level(),
    }
  }
}

/// Which repository backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
  /// Embedded single-file JSON store (local/dev).
  File,
  /// PostgreSQL server (production).
  Postgres,
}

/// Order storage configuration.
///
/// A `DATABASE_URL` env var switches the backend to `postgres`,
/// matching how the desk deploys the service.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
  /// Selected backend.
  #[serde(default = "default_backend")]
  pub backend: StorageBackend,
  /// Data directory for the file backend.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// PostgreSQL connection string for the postgres backend.
  pub database_url: Option<String>,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      backend: default_backend(),
      data_dir: default_data_dir(),
      database_url: None,
    }
  }
}

/// HMAC request authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  /// Shared secret. Unset means authenticated endpoints reject
  /// everything (fail closed). Prefer the API_HMAC_SECRET env var
  /// over committing a secret to the config file.
  pub secret: Option<String>,
  /// Tolerated clock skew in seconds.
  #[serde(default = "default_max_skew_seconds")]
  pub max_skew_seconds: i64,
}

impl Default for AuthConfig {
  fn default() -> Self {
    Self {
      secret: None,
      max_skew_seconds: default_max_skew_seconds(),
    }
  }
}

/// Lifecycle webhook configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
  /// Receiver URL. Unset disables delivery.
  pub url: Option<String>,
  /// Per-delivery timeout in milliseconds.
  #[serde(default = "default_webhook_timeout_ms")]
  pub timeout_ms: u64,
}

impl Default for WebhookConfig {
  fn default() -> Self {
    Self {
      url: None,
      timeout_ms: default_webhook_timeout_ms(),
    }
  }
}

// Default value functions for serde

fn default_bind_address() -> String {
  "0.0.0.0:3000".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_backend() -> StorageBackend {
  StorageBackend::File
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_max_skew_seconds() -> i64 {
  300
}

fn default_webhook_timeout_ms() -> u64 {
  5_000
}
