//! The summary a reconciliation pass hands back to its caller.

use serde::Serialize;

use crate::credential::CredentialSource;

/// Counts and absorbed failures from one reconciliation pass.
///
/// A pass never errors out to its caller; everything that went wrong below
/// the top level is summarised here instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
  /// The credential the pass ran under; `None` means the pass was skipped
  /// because nothing usable could be resolved.
  pub credential:           Option<CredentialSource>,
  pub courses_seen:         usize,
  pub courses_failed:       usize,
  pub assignments_created:  usize,
  /// Fan-out batches triggered — one per newly created assignment.
  pub fan_outs:             usize,
  pub notifications_sent:   usize,
  pub notifications_failed: usize,
  /// Human-readable detail for every absorbed failure.
  pub errors:               Vec<String>,
}

impl SyncReport {
  /// True when the pass did nothing because no credential was available.
  pub fn skipped(&self) -> bool { self.credential.is_none() }
}
