//! Error types for `davinci-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown skill tier: {0:?}")]
  UnknownTier(String),

  #[error("unknown category: {0:?}")]
  UnknownCategory(String),

  #[error("invalid contact: {0}")]
  InvalidContact(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
