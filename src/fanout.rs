//! Concurrent join with a deadline.
//!
//! Every future is spawned on the runtime; the join waits until all finish or
//! the ceiling elapses. Futures still pending at the deadline are abandoned:
//! their tasks keep running detached and their results are never observed.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutcome<T> {
  Completed(T),
  Errored(String),
  TimedOut,
}

impl<T> FanOutcome<T> {
  pub fn is_timed_out(&self) -> bool {
    matches!(self, FanOutcome::TimedOut)
  }
}

/// Run `futures` concurrently; outcomes come back in input order.
pub async fn join_with_deadline<F, T, E>(futures: Vec<F>, ceiling: Duration) -> Vec<FanOutcome<T>>
where
  F: Future<Output = Result<T, E>> + Send + 'static,
  T: Send + 'static,
  E: Display + Send + 'static,
{
  let deadline = Instant::now() + ceiling;
  let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();

  let mut outcomes = Vec::with_capacity(handles.len());
  for handle in handles {
    // Dropping the handle on timeout detaches the task.
    let outcome = match timeout_at(deadline, handle).await {
      Ok(Ok(Ok(value))) => FanOutcome::Completed(value),
      Ok(Ok(Err(e))) => FanOutcome::Errored(e.to_string()),
      Ok(Err(join)) => FanOutcome::Errored(join.to_string()),
      Err(_) => FanOutcome::TimedOut,
    };
    outcomes.push(outcome);
  }
  outcomes
}
