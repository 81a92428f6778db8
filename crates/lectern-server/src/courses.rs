//! Handlers for the local-mirror read endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/courses` | All mirrored courses |
//! | `GET`  | `/api/courses/:id/assignments` | Mirrored coursework for one course |
//! | `GET`  | `/api/courses/:id/roster` | Enrolled students for one course |
//!
//! These read the local store only; they never reach out to the external LMS.

use axum::{
  Json,
  extract::{Path, State},
};
use lectern_core::{
  course::{Assignment, Course, Enrollment},
  store::LmsStore,
};
use lectern_notify::sender::ChannelSender;

use crate::{AppState, error::ApiError};

/// `GET /api/courses`
pub async fn list<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
) -> Result<Json<Vec<Course>>, ApiError>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  let courses = state
    .store
    .list_courses()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(courses))
}

/// `GET /api/courses/:id/assignments`
pub async fn assignments<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
  Path(course_id): Path<String>,
) -> Result<Json<Vec<Assignment>>, ApiError>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  ensure_course(&state, &course_id).await?;
  let assignments = state
    .store
    .list_assignments(&course_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(assignments))
}

/// `GET /api/courses/:id/roster`
pub async fn roster<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
  Path(course_id): Path<String>,
) -> Result<Json<Vec<Enrollment>>, ApiError>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  ensure_course(&state, &course_id).await?;
  let roster = state
    .store
    .roster(&course_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(roster))
}

async fn ensure_course<S, E, C, M>(
  state: &AppState<S, E, C, M>,
  course_id: &str,
) -> Result<(), ApiError>
where
  S: LmsStore,
{
  state
    .store
    .get_course(course_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("course {course_id} not mirrored")))?;
  Ok(())
}
