//! Typed reqwest client for the external LMS REST API.

use std::time::Duration;

use lectern_core::lms::{LmsApi, RemoteCourse, RemoteCourseWork, RemoteStudent};
use reqwest::Client;
use serde::Deserialize;

use crate::{Error, Result};

// ─── Response envelopes ──────────────────────────────────────────────────────

// The external API wraps every list in a named field and omits the field
// entirely when the list is empty.

#[derive(Deserialize)]
struct CoursesResponse {
  #[serde(default)]
  courses: Vec<RemoteCourse>,
}

#[derive(Deserialize)]
struct CourseWorkResponse {
  #[serde(default)]
  coursework: Vec<RemoteCourseWork>,
}

#[derive(Deserialize)]
struct RosterResponse {
  #[serde(default)]
  students: Vec<RemoteStudent>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// An authenticated view of the external LMS.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. Every
/// request carries the bearer token the resolver issued this client with and
/// is bounded by the configured timeout so a stalled call cannot hold the
/// reconciliation slot indefinitely.
#[derive(Clone)]
pub struct LmsClient {
  http:     Client,
  base_url: String,
  token:    String,
}

impl LmsClient {
  pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_owned(),
      token,
    })
  }

  /// The bearer token this client was built with.
  pub fn token(&self) -> &str { &self.token }

  fn url(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

  async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
    let resp = self
      .http
      .get(self.url(path))
      .bearer_auth(&self.token)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::Api {
        path:   path.to_owned(),
        status: resp.status(),
      });
    }
    Ok(resp.json().await?)
  }
}

impl LmsApi for LmsClient {
  type Error = Error;

  /// `GET /courses`
  async fn list_courses(&self) -> Result<Vec<RemoteCourse>> {
    let resp: CoursesResponse = self.get_json("/courses").await?;
    Ok(resp.courses)
  }

  /// `GET /courses/{id}/coursework`
  async fn list_coursework(&self, course_id: &str) -> Result<Vec<RemoteCourseWork>> {
    let resp: CourseWorkResponse =
      self.get_json(&format!("/courses/{course_id}/coursework")).await?;
    Ok(resp.coursework)
  }

  /// `GET /courses/{id}/students`
  async fn list_roster(&self, course_id: &str) -> Result<Vec<RemoteStudent>> {
    let resp: RosterResponse =
      self.get_json(&format!("/courses/{course_id}/students")).await?;
    Ok(resp.students)
  }
}
