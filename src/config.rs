//! Loading the load-test configuration from TOML, then environment overrides.
//!
//! See `LoadConfig` for the expected schema. Every key is optional; defaults
//! target a local LMS with 10–15 s think time. How many users run, how fast
//! they hatch and for how long is goose's business (`-u`, `-r`, `-t`).

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::LoadError;
use crate::fixtures;
use crate::util::with_trailing_slash;

pub const DEFAULT_MIN_WAIT_MS: u64 = 10_000;
pub const DEFAULT_MAX_WAIT_MS: u64 = 15_000;

/// HTTP basic-auth credentials attached to every request of a session.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct BasicAuth {
  pub user: String,
  pub password: String,
}

impl fmt::Debug for BasicAuth {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BasicAuth").field("user", &self.user).field("password", &"***").finish()
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
  /// Root of the LMS; handed to goose as the default `--host`.
  pub host: String,
  pub problem: String,
  /// Prefix for the Referer header on POSTs.
  pub referer_host: String,
  pub min_wait_ms: u64,
  pub max_wait_ms: u64,
  pub request_timeout_secs: u64,
  pub verify_tls: bool,
  pub basic_auth: Option<BasicAuth>,
}

impl Default for LoadConfig {
  fn default() -> Self {
    Self {
      host: "http://localhost:8000/".into(),
      problem: "example_based".into(),
      referer_host: "https://courses.dev.edx.org/".into(),
      min_wait_ms: DEFAULT_MIN_WAIT_MS,
      max_wait_ms: DEFAULT_MAX_WAIT_MS,
      request_timeout_secs: 30,
      verify_tls: false,
      basic_auth: None,
    }
  }
}

impl LoadConfig {
  /// Read LOADTEST_CONFIG_PATH (if set), apply env overrides and validate.
  pub fn from_env() -> Result<Self, LoadError> {
    let base = match std::env::var("LOADTEST_CONFIG_PATH") {
      Ok(path) => Self::from_file(&path)?,
      Err(_) => Self::default(),
    };
    let cfg = base.with_overrides(|key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn from_file(path: &str) -> Result<Self, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
      error!(target: "ora_loadtest", %path, error = %e, "Failed to read TOML config file");
      LoadError::Config(format!("cannot read {path}: {e}"))
    })?;
    let cfg = Self::from_toml(&raw).map_err(|e| {
      error!(target: "ora_loadtest", %path, error = %e, "Failed to parse TOML config");
      e
    })?;
    info!(target: "ora_loadtest", %path, "Loaded load-test config (TOML)");
    Ok(cfg)
  }

  pub fn from_toml(raw: &str) -> Result<Self, LoadError> {
    toml::from_str::<Self>(raw).map_err(|e| LoadError::Config(e.to_string()))
  }

  /// Apply overrides from a key lookup (the process environment in production).
  pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, LoadError>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(v) = lookup("TARGET_HOST") { self.host = v; }
    if let Some(v) = lookup("PROBLEM") { self.problem = v; }
    if let Some(v) = lookup("REFERER_HOST") { self.referer_host = v; }
    if let Some(v) = lookup("MIN_WAIT_MS") { self.min_wait_ms = parse_num("MIN_WAIT_MS", &v)?; }
    if let Some(v) = lookup("MAX_WAIT_MS") { self.max_wait_ms = parse_num("MAX_WAIT_MS", &v)?; }
    if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
      self.request_timeout_secs = parse_num("REQUEST_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = lookup("VERIFY_TLS") { self.verify_tls = parse_bool("VERIFY_TLS", &v)?; }

    // Both halves are required; a lone user or password is ignored.
    if let (Some(user), Some(password)) = (lookup("BASIC_AUTH_USER"), lookup("BASIC_AUTH_PASSWORD")) {
      self.basic_auth = Some(BasicAuth { user, password });
    }

    self.host = with_trailing_slash(&self.host);
    self.referer_host = with_trailing_slash(&self.referer_host);
    Ok(self)
  }

  pub fn validate(&self) -> Result<(), LoadError> {
    if self.min_wait_ms > self.max_wait_ms {
      return Err(LoadError::Config(format!(
        "min_wait_ms ({}) exceeds max_wait_ms ({})",
        self.min_wait_ms, self.max_wait_ms
      )));
    }
    for url in [&self.host, &self.referer_host] {
      reqwest::Url::parse(url).map_err(|e| LoadError::InvalidUrl { url: url.clone(), reason: e.to_string() })?;
    }
    if fixtures::lookup(&self.problem).is_err() {
      let known: Vec<_> = fixtures::names().collect();
      return Err(LoadError::Config(format!("unknown problem '{}' (known: {})", self.problem, known.join(", "))));
    }
    Ok(())
  }

  pub fn min_wait(&self) -> Duration {
    Duration::from_millis(self.min_wait_ms)
  }

  pub fn max_wait(&self) -> Duration {
    Duration::from_millis(self.max_wait_ms)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, LoadError>
where
  T::Err: fmt::Display,
{
  raw.trim().parse::<T>().map_err(|e| LoadError::Config(format!("{key}='{raw}': {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, LoadError> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(LoadError::Config(format!("{key}='{raw}': expected a boolean"))),
  }
}
