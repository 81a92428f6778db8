//! Error type for `lectern-lms`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The external API answered with a non-success status.
  #[error("api error: {path} → {status}")]
  Api {
    path:   String,
    status: reqwest::StatusCode,
  },

  /// The token endpoint rejected a refresh grant (invalid or revoked token,
  /// or a transport failure — not distinguished; the pass is skipped either
  /// way).
  #[error("token refresh rejected: {0}")]
  RefreshRejected(String),

  #[error("service key unreadable: {0}")]
  ServiceKey(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
