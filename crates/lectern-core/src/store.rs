//! The `LmsStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `lectern-store-sqlite`).
//! Higher layers (`lectern-sync`, `lectern-notify`, `lectern-server`) depend
//! on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  course::{Assignment, Course, Enrollment, NewAssignment, NewCourse},
  credential::{Credential, NewCredential},
  notification::{DeliveryStatus, NewNotification, Notification},
};

// ─── Insert outcome ──────────────────────────────────────────────────────────

/// Result of an atomic insert-if-absent on Assignment.
///
/// `Exists` is the expected outcome under races and on every re-sync of an
/// already-mirrored item; it is not an error, and callers must not fan out
/// notifications when they observe it.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
  Created(Assignment),
  Exists,
}

impl InsertOutcome {
  pub fn created(&self) -> Option<&Assignment> {
    match self {
      Self::Created(a) => Some(a),
      Self::Exists => None,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the Lectern mirror store backend.
///
/// Course/Enrollment/Assignment writes belong exclusively to reconciliation;
/// Credential writes to the resolver; Notification writes to the dispatcher.
/// The backend must make `insert_assignment_if_absent` atomic (a uniqueness
/// constraint, not a check-then-act), because that constraint is what keeps
/// notification fan-out exactly-once under concurrent passes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait LmsStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Courses ───────────────────────────────────────────────────────────

  /// Insert or fully replace the mutable fields of a course, keyed by
  /// `external_id`. `synced_at` is set by the store.
  fn upsert_course(
    &self,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  /// Retrieve a course by external id. Returns `None` if not mirrored.
  fn get_course<'a>(
    &'a self,
    external_id: &'a str,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + 'a;

  fn list_courses(
    &self,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  // ── Enrollments ───────────────────────────────────────────────────────

  /// Record membership; a duplicate `(student, course)` pair is a no-op.
  fn upsert_enrollment<'a>(
    &'a self,
    student_external_id: &'a str,
    course_external_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// All enrollments for a course — the notification recipient set.
  fn roster<'a>(
    &'a self,
    course_external_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Enrollment>, Self::Error>> + Send + 'a;

  // ── Assignments ───────────────────────────────────────────────────────

  /// Atomically create the assignment unless one with the same
  /// `external_id` already exists. Exactly one caller across any number of
  /// concurrent passes observes `Created`.
  fn insert_assignment_if_absent(
    &self,
    input: NewAssignment,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  fn list_assignments<'a>(
    &'a self,
    course_external_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + 'a;

  // ── Credentials ───────────────────────────────────────────────────────

  /// Persist a freshly issued credential. Rejects an empty access token.
  fn add_credential(
    &self,
    input: NewCredential,
  ) -> impl Future<Output = Result<Credential, Self::Error>> + Send + '_;

  /// The most recently created credential for an owner, if any.
  fn latest_credential(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Option<Credential>, Self::Error>> + Send + '_;

  /// Replace the access token and expiry of an existing credential in a
  /// single atomic write. Used after a successful refresh; the row identity
  /// and refresh token are unchanged.
  fn apply_refresh(
    &self,
    credential_id: Uuid,
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Persist a new delivery attempt in `Pending` state.
  fn add_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  /// Move a pending attempt to `Sent`.
  fn mark_notification_sent(
    &self,
    notification_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Move a pending attempt to `Failed`, recording the error detail.
  fn mark_notification_failed(
    &self,
    notification_id: Uuid,
    error: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delivery records, newest first, optionally filtered by status.
  fn list_notifications(
    &self,
    status: Option<DeliveryStatus>,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;
}
