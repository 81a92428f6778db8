//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as ISO 8601
//! dates, UUIDs as hyphenated lowercase strings. Channel and status enums
//! round-trip through their lowercase `strum` forms.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use lectern_core::{
  course::{Assignment, Course, Enrollment},
  credential::Credential,
  notification::{Channel, DeliveryStatus, Notification},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::from_str(s).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Channel / DeliveryStatus ────────────────────────────────────────────────

pub fn decode_channel(s: &str) -> Result<Channel> {
  Channel::from_str(s)
    .map_err(|_| lectern_core::Error::UnknownChannel(s.to_owned()).into())
}

pub fn decode_status(s: &str) -> Result<DeliveryStatus> {
  DeliveryStatus::from_str(s)
    .map_err(|_| lectern_core::Error::UnknownStatus(s.to_owned()).into())
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `courses` row.
pub struct RawCourse {
  pub external_id:       String,
  pub name:              String,
  pub section:           Option<String>,
  pub description:       Option<String>,
  pub owner_external_id: Option<String>,
  pub synced_at:         String,
}

impl RawCourse {
  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      external_id:       self.external_id,
      name:              self.name,
      section:           self.section,
      description:       self.description,
      owner_external_id: self.owner_external_id,
      synced_at:         decode_dt(&self.synced_at)?,
    })
  }
}

/// Raw strings read directly from an `enrollments` row.
pub struct RawEnrollment {
  pub student_external_id: String,
  pub course_external_id:  String,
  pub recorded_at:         String,
}

impl RawEnrollment {
  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      student_external_id: self.student_external_id,
      course_external_id:  self.course_external_id,
      recorded_at:         decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from an `assignments` row.
pub struct RawAssignment {
  pub external_id:        String,
  pub course_external_id: String,
  pub title:              String,
  pub description:        Option<String>,
  pub due_date:           Option<String>,
  pub created_at:         String,
}

impl RawAssignment {
  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      external_id:        self.external_id,
      course_external_id: self.course_external_id,
      title:              self.title,
      description:        self.description,
      due_date:           self.due_date.as_deref().map(decode_date).transpose()?,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `credentials` row.
pub struct RawCredential {
  pub credential_id: String,
  pub owner_id:      String,
  pub access_token:  String,
  pub refresh_token: Option<String>,
  pub expires_at:    Option<String>,
  pub created_at:    String,
}

impl RawCredential {
  pub fn into_credential(self) -> Result<Credential> {
    Ok(Credential {
      credential_id: decode_uuid(&self.credential_id)?,
      owner_id:      decode_uuid(&self.owner_id)?,
      access_token:  self.access_token,
      refresh_token: self.refresh_token,
      expires_at:    self.expires_at.as_deref().map(decode_dt).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub channel:         String,
  pub recipient:       String,
  pub subject:         Option<String>,
  pub body:            Option<String>,
  pub status:          String,
  pub error:           Option<String>,
  pub created_at:      String,
}

impl RawNotification {
  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      channel:         decode_channel(&self.channel)?,
      recipient:       self.recipient,
      subject:         self.subject,
      body:            self.body,
      status:          decode_status(&self.status)?,
      error:           self.error,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
