//! Virtual-user behavior against the OpenAssessment block, as a goose scenario.
//!
//! Every tick either logs in (when logged out) or runs one submit cycle and
//! then logs in again as a fresh user. An identity may submit only once, so
//! switching identities after each submission keeps the load realistic
//! without piling up "already submitted" replies.

use std::sync::Arc;

use goose::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::client::HttpSession;
use crate::config::LoadConfig;
use crate::error::LoadError;
use crate::fixtures;
use crate::page::{PageDriver, SessionState};

pub const SCENARIO_NAME: &str = "OpenAssessmentTasks";

/// One goose scenario: `start_session` once per user, then `example_based`
/// in a loop with the configured think time in between.
///
/// Fails fast when the configured problem has no fixture.
pub fn scenario(cfg: LoadConfig) -> Result<Scenario, LoadError> {
  fixtures::lookup(&cfg.problem)?;
  let (min_wait, max_wait) = (cfg.min_wait(), cfg.max_wait());
  let cfg = Arc::new(cfg);

  let on_start: TransactionFunction = Arc::new(move |user| {
    let cfg = cfg.clone();
    Box::pin(async move { into_transaction_result(start_session(user, &cfg)) })
  });

  Ok(
    scenario!(SCENARIO_NAME)
      .set_wait_time(min_wait, max_wait)?
      .register_transaction(Transaction::new(on_start).set_name("start_session").set_on_start())
      .register_transaction(transaction!(example_based)),
  )
}

/// Give the user its own client and a logged-out page driver.
pub fn start_session(user: &mut GooseUser, cfg: &LoadConfig) -> Result<(), LoadError> {
  let session = HttpSession::attach(user, cfg)?;
  let page = PageDriver::new(session, &cfg.problem, &cfg.referer_host)?;
  info!(target: "ora_loadtest", user = user.weighted_users_index, problem = %cfg.problem, "Virtual user started");
  user.set_session_data(page);
  Ok(())
}

/// The scheduled task: one orchestrator tick on the user's page driver.
pub async fn example_based(user: &mut GooseUser) -> TransactionResult {
  let Some(mut page) = user.get_session_data::<PageDriver>().cloned() else {
    warn!(target: "ora_loadtest", user = user.weighted_users_index, "No page driver; start_session did not complete");
    return Ok(());
  };
  let ticked = tick(&mut page, user).await;
  user.set_session_data(page);
  into_transaction_result(ticked)
}

pub async fn tick(page: &mut PageDriver, user: &mut GooseUser) -> Result<(), LoadError> {
  match page.state() {
    SessionState::Unauthenticated => {
      page.authenticate(user).await?;
    }
    SessionState::Authenticated => {
      // The identity is spent once a submit was attempted, even if the cycle broke off.
      let cycle = submit_cycle(page, user).await;
      let relogin = page.authenticate(user).await;
      cycle?;
      relogin?;
    }
  }
  Ok(())
}

/// Load the steps, submit a response, then reload the steps
/// (the browser re-renders them over AJAX after submitting).
#[instrument(level = "debug", skip(page, user))]
async fn submit_cycle(page: &mut PageDriver, user: &mut GooseUser) -> Result<(), LoadError> {
  page.load_steps(user).await?;
  let outcome = page.submit_response(user).await?;
  debug!(target: "page", ?outcome, "Submit cycle");
  page.load_steps(user).await?;
  Ok(())
}

/// goose counts an `Err` as a failed transaction. Requests already carry
/// their own failure in goose's metrics, so only errors goose can represent
/// are handed back; the rest are logged.
fn into_transaction_result(result: Result<(), LoadError>) -> TransactionResult {
  match result {
    Ok(()) => Ok(()),
    Err(LoadError::Goose(e)) => Err(e),
    Err(LoadError::Transport(e)) => Err(Box::new(TransactionError::Reqwest(e))),
    Err(e) => {
      error!(target: "ora_loadtest", error = %e, "Transaction aborted");
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scenario_builds_for_the_default_problem() {
    assert!(scenario(LoadConfig::default()).is_ok());
  }

  #[test]
  fn scenario_rejects_unknown_problem() {
    let cfg = LoadConfig { problem: "ghost".into(), ..LoadConfig::default() };
    assert!(matches!(scenario(cfg), Err(LoadError::UnknownProblem(_))));
  }

  #[test]
  fn inverted_wait_range_is_a_goose_error() {
    let cfg = LoadConfig { min_wait_ms: 2_000, max_wait_ms: 1_000, ..LoadConfig::default() };
    assert!(matches!(scenario(cfg), Err(LoadError::Attack(_))));
  }

  #[test]
  fn only_goose_representable_errors_fail_the_transaction() {
    assert!(into_transaction_result(Ok(())).is_ok());
    assert!(into_transaction_result(Err(LoadError::Config("late".into()))).is_ok());
    assert!(into_transaction_result(Err(LoadError::UnknownProblem("x".into()))).is_ok());
  }
}
