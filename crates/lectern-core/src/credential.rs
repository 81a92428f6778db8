//! OAuth-style credentials and the sync-target/source vocabulary.
//!
//! A credential row is mutated in exactly one way after creation: a token
//! refresh replaces `access_token` and `expires_at` in a single atomic write.
//! History per owner may accumulate; only the most recent row (by creation
//! time) is authoritative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Credential ──────────────────────────────────────────────────────────────

/// A stored per-user access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
  pub credential_id: Uuid,
  pub owner_id:      Uuid,
  pub access_token:  String,
  pub refresh_token: Option<String>,
  pub expires_at:    Option<DateTime<Utc>>,
  pub created_at:    DateTime<Utc>,
}

impl Credential {
  /// An absent `expires_at` means the token does not expire.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.is_some_and(|at| at <= now)
  }

  /// Expired with no refresh token means there is no path back to a usable
  /// client; the resolver must not return such a credential.
  pub fn is_refreshable(&self) -> bool { self.refresh_token.is_some() }
}

/// Input to [`crate::store::LmsStore::add_credential`].
/// `credential_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewCredential {
  pub owner_id:      Uuid,
  pub access_token:  String,
  pub refresh_token: Option<String>,
  pub expires_at:    Option<DateTime<Utc>>,
}

// ─── Targets and sources ─────────────────────────────────────────────────────

/// Whose credential a sync pass should run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
  /// The domain-wide service identity (cross-roster scope).
  System,
  /// A specific user's delegated credential.
  User(Uuid),
}

/// Which source a resolution actually came from — tagged onto the result so
/// callers (and tests) can assert the precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CredentialSource {
  Service,
  User { owner_id: Uuid },
}
