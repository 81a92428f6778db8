//! Notification records — one row per delivery attempt, never reused.
//!
//! A record is created `pending` before the external send, then moved to
//! exactly one terminal state. A retry is a new record; the old one keeps its
//! outcome forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Channel ─────────────────────────────────────────────────────────────────

/// The delivery channel for a notification.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
  Email,
  Chat,
  Sms,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle of a delivery attempt: `Pending` → `Sent` | `Failed`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryStatus {
  Pending,
  Sent,
  Failed,
}

// ─── Notification ────────────────────────────────────────────────────────────

/// A persisted delivery attempt. A row stuck in `Pending` means the process
/// died between the write and the send — observable by operators, never lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub channel:         Channel,
  pub recipient:       String,
  pub subject:         Option<String>,
  pub body:            Option<String>,
  pub status:          DeliveryStatus,
  /// Error detail; present only when `status` is `Failed`.
  pub error:           Option<String>,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::LmsStore::add_notification`]. The stored row
/// always starts out `Pending`.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub channel:   Channel,
  pub recipient: String,
  pub subject:   Option<String>,
  pub body:      Option<String>,
}
