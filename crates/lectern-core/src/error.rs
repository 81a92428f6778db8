//! Error types for `lectern-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A credential with an empty access token is never valid.
  #[error("credential access token is empty")]
  EmptyAccessToken,

  #[error("unknown notification channel: {0:?}")]
  UnknownChannel(String),

  #[error("unknown delivery status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
