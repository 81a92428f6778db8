//! [`SqliteStore`] — the SQLite implementation of [`LmsStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use lectern_core::{
  course::{Assignment, Course, Enrollment, NewAssignment, NewCourse},
  credential::{Credential, NewCredential},
  notification::{
    DeliveryStatus, NewNotification, Notification,
  },
  store::{InsertOutcome, LmsStore},
};

use crate::{
  encode::{
    encode_date, encode_dt, encode_uuid, RawAssignment, RawCourse,
    RawCredential, RawEnrollment, RawNotification,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lectern mirror store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LmsStore impl ───────────────────────────────────────────────────────────

impl LmsStore for SqliteStore {
  type Error = Error;

  // ── Courses ───────────────────────────────────────────────────────────────

  async fn upsert_course(&self, input: NewCourse) -> Result<Course> {
    let course = Course {
      external_id:       input.external_id,
      name:              input.name,
      section:           input.section,
      description:       input.description,
      owner_external_id: input.owner_external_id,
      synced_at:         Utc::now(),
    };

    let external_id = course.external_id.clone();
    let name        = course.name.clone();
    let section     = course.section.clone();
    let description = course.description.clone();
    let owner       = course.owner_external_id.clone();
    let synced_str  = encode_dt(course.synced_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO courses (
             external_id, name, section, description, owner_external_id, synced_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (external_id) DO UPDATE SET
             name              = excluded.name,
             section           = excluded.section,
             description       = excluded.description,
             owner_external_id = excluded.owner_external_id,
             synced_at         = excluded.synced_at",
          rusqlite::params![
            external_id,
            name,
            section,
            description,
            owner,
            synced_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(course)
  }

  async fn get_course(&self, external_id: &str) -> Result<Option<Course>> {
    let id = external_id.to_owned();

    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT external_id, name, section, description, owner_external_id, synced_at
             FROM courses WHERE external_id = ?1",
            rusqlite::params![id],
            |row| {
              Ok(RawCourse {
                external_id:       row.get(0)?,
                name:              row.get(1)?,
                section:           row.get(2)?,
                description:       row.get(3)?,
                owner_external_id: row.get(4)?,
                synced_at:         row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn list_courses(&self) -> Result<Vec<Course>> {
    let raws: Vec<RawCourse> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT external_id, name, section, description, owner_external_id, synced_at
           FROM courses ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCourse {
              external_id:       row.get(0)?,
              name:              row.get(1)?,
              section:           row.get(2)?,
              description:       row.get(3)?,
              owner_external_id: row.get(4)?,
              synced_at:         row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }

  // ── Enrollments ───────────────────────────────────────────────────────────

  async fn upsert_enrollment(
    &self,
    student_external_id: &str,
    course_external_id: &str,
  ) -> Result<()> {
    let student = student_external_id.to_owned();
    let course  = course_external_id.to_owned();
    let at_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        // The composite primary key absorbs duplicates.
        conn.execute(
          "INSERT INTO enrollments (student_external_id, course_external_id, recorded_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (student_external_id, course_external_id) DO NOTHING",
          rusqlite::params![student, course, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn roster(&self, course_external_id: &str) -> Result<Vec<Enrollment>> {
    let course = course_external_id.to_owned();

    let raws: Vec<RawEnrollment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT student_external_id, course_external_id, recorded_at
           FROM enrollments WHERE course_external_id = ?1
           ORDER BY student_external_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![course], |row| {
            Ok(RawEnrollment {
              student_external_id: row.get(0)?,
              course_external_id:  row.get(1)?,
              recorded_at:         row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEnrollment::into_enrollment).collect()
  }

  // ── Assignments ───────────────────────────────────────────────────────────

  async fn insert_assignment_if_absent(
    &self,
    input: NewAssignment,
  ) -> Result<InsertOutcome> {
    let assignment = Assignment {
      external_id:        input.external_id,
      course_external_id: input.course_external_id,
      title:              input.title,
      description:        input.description,
      due_date:           input.due_date,
      created_at:         Utc::now(),
    };

    let external_id  = assignment.external_id.clone();
    let course_id    = assignment.course_external_id.clone();
    let title        = assignment.title.clone();
    let description  = assignment.description.clone();
    let due_date_str = assignment.due_date.map(encode_date);
    let created_str  = encode_dt(assignment.created_at);

    // The primary key on external_id makes this a single atomic
    // insert-if-absent; the row count tells us which side of the race we
    // were on.
    let inserted: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO assignments (
             external_id, course_external_id, title, description, due_date, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (external_id) DO NOTHING",
          rusqlite::params![
            external_id,
            course_id,
            title,
            description,
            due_date_str,
            created_str,
          ],
        )?;
        Ok(n)
      })
      .await?;

    if inserted == 1 {
      Ok(InsertOutcome::Created(assignment))
    } else {
      Ok(InsertOutcome::Exists)
    }
  }

  async fn list_assignments(
    &self,
    course_external_id: &str,
  ) -> Result<Vec<Assignment>> {
    let course = course_external_id.to_owned();

    let raws: Vec<RawAssignment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT external_id, course_external_id, title, description, due_date, created_at
           FROM assignments WHERE course_external_id = ?1
           ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![course], |row| {
            Ok(RawAssignment {
              external_id:        row.get(0)?,
              course_external_id: row.get(1)?,
              title:              row.get(2)?,
              description:        row.get(3)?,
              due_date:           row.get(4)?,
              created_at:         row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssignment::into_assignment).collect()
  }

  // ── Credentials ───────────────────────────────────────────────────────────

  async fn add_credential(&self, input: NewCredential) -> Result<Credential> {
    if input.access_token.is_empty() {
      return Err(lectern_core::Error::EmptyAccessToken.into());
    }

    let credential = Credential {
      credential_id: Uuid::new_v4(),
      owner_id:      input.owner_id,
      access_token:  input.access_token,
      refresh_token: input.refresh_token,
      expires_at:    input.expires_at,
      created_at:    Utc::now(),
    };

    let id_str      = encode_uuid(credential.credential_id);
    let owner_str   = encode_uuid(credential.owner_id);
    let access      = credential.access_token.clone();
    let refresh     = credential.refresh_token.clone();
    let expires_str = credential.expires_at.map(encode_dt);
    let created_str = encode_dt(credential.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO credentials (
             credential_id, owner_id, access_token, refresh_token, expires_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            owner_str,
            access,
            refresh,
            expires_str,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(credential)
  }

  async fn latest_credential(&self, owner_id: Uuid) -> Result<Option<Credential>> {
    let owner_str = encode_uuid(owner_id);

    let raw: Option<RawCredential> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT credential_id, owner_id, access_token, refresh_token, expires_at, created_at
             FROM credentials WHERE owner_id = ?1
             ORDER BY created_at DESC LIMIT 1",
            rusqlite::params![owner_str],
            |row| {
              Ok(RawCredential {
                credential_id: row.get(0)?,
                owner_id:      row.get(1)?,
                access_token:  row.get(2)?,
                refresh_token: row.get(3)?,
                expires_at:    row.get(4)?,
                created_at:    row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCredential::into_credential).transpose()
  }

  async fn apply_refresh(
    &self,
    credential_id: Uuid,
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let id_str      = encode_uuid(credential_id);
    let expires_str = expires_at.map(encode_dt);

    // Single UPDATE so two racing resolutions cannot interleave a
    // read-modify-write and lose one of the refreshed tokens.
    let updated: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE credentials SET access_token = ?2, expires_at = ?3
           WHERE credential_id = ?1",
          rusqlite::params![id_str, access_token, expires_str],
        )?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::CredentialNotFound(credential_id));
    }
    Ok(())
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn add_notification(&self, input: NewNotification) -> Result<Notification> {
    let notification = Notification {
      notification_id: Uuid::new_v4(),
      channel:         input.channel,
      recipient:       input.recipient,
      subject:         input.subject,
      body:            input.body,
      status:          DeliveryStatus::Pending,
      error:           None,
      created_at:      Utc::now(),
    };

    let id_str      = encode_uuid(notification.notification_id);
    let channel_str = notification.channel.to_string();
    let recipient   = notification.recipient.clone();
    let subject     = notification.subject.clone();
    let body        = notification.body.clone();
    let status_str  = notification.status.to_string();
    let created_str = encode_dt(notification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, channel, recipient, subject, body, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            channel_str,
            recipient,
            subject,
            body,
            status_str,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn mark_notification_sent(&self, notification_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(notification_id);

    let updated: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE notifications SET status = 'sent', error = NULL
           WHERE notification_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::NotificationNotFound(notification_id));
    }
    Ok(())
  }

  async fn mark_notification_failed(
    &self,
    notification_id: Uuid,
    error: String,
  ) -> Result<()> {
    let id_str = encode_uuid(notification_id);

    let updated: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE notifications SET status = 'failed', error = ?2
           WHERE notification_id = ?1",
          rusqlite::params![id_str, error],
        )?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::NotificationNotFound(notification_id));
    }
    Ok(())
  }

  async fn list_notifications(
    &self,
    status: Option<DeliveryStatus>,
  ) -> Result<Vec<Notification>> {
    let status_str = status.map(|s| s.to_string());

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = status_str {
          let mut stmt = conn.prepare(
            "SELECT notification_id, channel, recipient, subject, body, status, error, created_at
             FROM notifications WHERE status = ?1
             ORDER BY created_at DESC",
          )?;
          stmt
            .query_map(rusqlite::params![s], |row| {
              Ok(RawNotification {
                notification_id: row.get(0)?,
                channel:         row.get(1)?,
                recipient:       row.get(2)?,
                subject:         row.get(3)?,
                body:            row.get(4)?,
                status:          row.get(5)?,
                error:           row.get(6)?,
                created_at:      row.get(7)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT notification_id, channel, recipient, subject, body, status, error, created_at
             FROM notifications ORDER BY created_at DESC",
          )?;
          stmt
            .query_map([], |row| {
              Ok(RawNotification {
                notification_id: row.get(0)?,
                channel:         row.get(1)?,
                recipient:       row.get(2)?,
                subject:         row.get(3)?,
                body:            row.get(4)?,
                status:          row.get(5)?,
                error:           row.get(6)?,
                created_at:      row.get(7)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }
}
