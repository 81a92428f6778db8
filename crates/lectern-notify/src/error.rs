//! Error type for `lectern-notify`.

use thiserror::Error;

/// A failed delivery attempt. The dispatcher never propagates these; the
/// text ends up on the Notification record instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The delivery API answered with a non-success status.
  #[error("delivery api → {status}: {detail}")]
  Api {
    status: reqwest::StatusCode,
    detail: String,
  },

  /// Channel-agnostic delivery failure (used by in-process senders).
  #[error("delivery failed: {0}")]
  Delivery(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
