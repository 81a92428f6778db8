//! Local mirror records for courses, enrollments, and assignments.
//!
//! All three are caches of the external LMS, never a source of truth.
//! Identity is the external system's id; reconciliation is the only writer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Course ──────────────────────────────────────────────────────────────────

/// A mirrored course. `external_id` is the identity; every other field is
/// replaced wholesale on each reconciliation upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
  pub external_id:       String,
  pub name:              String,
  pub section:           Option<String>,
  pub description:       Option<String>,
  /// External id of the course owner (the teacher), when the LMS reports one.
  pub owner_external_id: Option<String>,
  /// When reconciliation last wrote this row; store-assigned.
  pub synced_at:         DateTime<Utc>,
}

/// Input to [`crate::store::LmsStore::upsert_course`].
/// `synced_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewCourse {
  pub external_id:       String,
  pub name:              String,
  pub section:           Option<String>,
  pub description:       Option<String>,
  pub owner_external_id: Option<String>,
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

/// Membership of one student in one course. The composite
/// `(student_external_id, course_external_id)` pair is unique; repeated roster
/// syncs are no-ops. The student external id doubles as the notification
/// address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
  pub student_external_id: String,
  pub course_external_id:  String,
  pub recorded_at:         DateTime<Utc>,
}

// ─── Assignment ──────────────────────────────────────────────────────────────

/// A mirrored coursework item. Its mere existence is the dedupe signal:
/// an assignment is created at most once per `external_id`, and notification
/// fan-out happens only on that single creation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
  pub external_id:        String,
  pub course_external_id: String,
  pub title:              String,
  pub description:        Option<String>,
  pub due_date:           Option<NaiveDate>,
  /// Store-assigned creation timestamp; never changes.
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::LmsStore::insert_assignment_if_absent`].
#[derive(Debug, Clone)]
pub struct NewAssignment {
  pub external_id:        String,
  pub course_external_id: String,
  pub title:              String,
  pub description:        Option<String>,
  pub due_date:           Option<NaiveDate>,
}
