//! The external-LMS client abstraction and its wire shapes.
//!
//! The external system's own API semantics are not modelled here beyond the
//! three list calls reconciliation consumes. `lectern-lms` provides the
//! reqwest-backed implementation; tests substitute stubs.

use std::future::Future;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::credential::{CredentialSource, SyncTarget};

// ─── Wire shapes ─────────────────────────────────────────────────────────────

/// A course as reported by the external LMS.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCourse {
  pub id:          String,
  pub name:        String,
  pub section:     Option<String>,
  pub description: Option<String>,
  /// External id of the owning teacher.
  pub owner_id:    Option<String>,
}

/// A coursework item as reported by the external LMS.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCourseWork {
  pub id:          String,
  pub title:       String,
  pub description: Option<String>,
  pub due_date:    Option<NaiveDate>,
}

/// A roster entry. The student id is also the notification address.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteStudent {
  pub student_id: String,
}

// ─── Client trait ────────────────────────────────────────────────────────────

/// A usable, authenticated view of the external LMS.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LmsApi: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_courses(
    &self,
  ) -> impl Future<Output = Result<Vec<RemoteCourse>, Self::Error>> + Send + '_;

  fn list_coursework<'a>(
    &'a self,
    course_id: &'a str,
  ) -> impl Future<Output = Result<Vec<RemoteCourseWork>, Self::Error>> + Send + 'a;

  fn list_roster<'a>(
    &'a self,
    course_id: &'a str,
  ) -> impl Future<Output = Result<Vec<RemoteStudent>, Self::Error>> + Send + 'a;
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Outcome of credential resolution: either a ready-to-use client tagged with
/// the source it came from, or nothing usable. `Unavailable` is a normal
/// no-op outcome for a sync pass, not an error.
pub enum Resolution<A> {
  Resolved { api: A, source: CredentialSource },
  Unavailable,
}

/// Produces authenticated LMS clients for sync targets.
///
/// Implementations swallow their own failures (missing key material, refresh
/// rejections) into `Unavailable`; nothing propagates to callers.
pub trait ApiSource: Send + Sync {
  type Api: LmsApi;

  fn resolve(
    &self,
    target: SyncTarget,
  ) -> impl Future<Output = Resolution<Self::Api>> + Send + '_;

  /// Evaluate an explicit ordered list of sources until one succeeds.
  /// Callers put [`SyncTarget::System`] first for cross-roster work.
  fn resolve_chain<'a>(
    &'a self,
    targets: &'a [SyncTarget],
  ) -> impl Future<Output = Resolution<Self::Api>> + Send + 'a {
    async move {
      for target in targets {
        if let Resolution::Resolved { api, source } = self.resolve(*target).await {
          return Resolution::Resolved { api, source };
        }
      }
      Resolution::Unavailable
    }
  }
}
