//! ora-loadtest · OpenAssessment load driver
//!
//! - goose runs the virtual users, each with its own cookie-backed HTTP session
//! - 10–15 s randomized think time between task ticks
//! - goose prints its request metrics when the attack ends
//!
//! goose's own flags pick the user count, hatch rate and run time, e.g.
//!   ora-loadtest -u 50 -r 5 -t 10m
//!
//! Important env variables:
//!   LOADTEST_CONFIG_PATH : optional TOML config (same keys as below, lowercase)
//!   TARGET_HOST          : LMS root, goose's default --host (default "http://localhost:8000/")
//!   REFERER_HOST         : Referer prefix on POSTs (default "https://courses.dev.edx.org/")
//!   MIN_WAIT_MS / MAX_WAIT_MS : think time bounds
//!   BASIC_AUTH_USER / BASIC_AUTH_PASSWORD : HTTP basic auth (both required)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

use goose::prelude::*;
use tracing::{error, info};

use ora_loadtest::config::LoadConfig;
use ora_loadtest::{tasks, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = LoadConfig::from_env().map_err(|e| {
    error!(target: "ora_loadtest", error = %e, "Invalid configuration");
    e
  })?;
  info!(
    target: "ora_loadtest",
    host = %cfg.host,
    problem = %cfg.problem,
    basic_auth = cfg.basic_auth.is_some(),
    verify_tls = cfg.verify_tls,
    "Starting load test"
  );

  let host = cfg.host.clone();
  GooseAttack::initialize()?
    .set_default(GooseDefault::Host, host.as_str())?
    .register_scenario(tasks::scenario(cfg)?)
    .execute()
    .await?;

  Ok(())
}
