//! Error type shared by the driver, the goose transactions and configuration loading.

use goose::prelude::{GooseError, TransactionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
  /// Problem name has no entry in the fixture registry.
  #[error("unknown problem fixture '{0}'")]
  UnknownProblem(String),

  #[error("http transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("invalid url '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },

  /// goose refused to build or record a request.
  #[error("goose request error: {0}")]
  Goose(#[from] Box<TransactionError>),

  /// Scenario or attack setup rejected by goose.
  #[error("load test setup failed: {0}")]
  Attack(#[from] GooseError),

  #[error("configuration error: {0}")]
  Config(String),
}

impl From<TransactionError> for LoadError {
  fn from(e: TransactionError) -> Self {
    LoadError::Goose(Box::new(e))
  }
}
