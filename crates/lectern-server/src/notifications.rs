//! Handlers for notification inspection and direct sends.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/notifications` | Delivery records; optional `?status=` filter |
//! | `POST` | `/api/notifications/send-email` | Body: `{to, subject, text}` |
//! | `POST` | `/api/notifications/send-chat` | Body: `{to, text}` |
//! | `POST` | `/api/notifications/send-sms` | Body: `{to, text}` |
//!
//! A send endpoint always leaves a persisted record; the response status says
//! whether the single delivery attempt succeeded (200) or failed (500, with
//! the error on the returned record).

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use lectern_core::{
  notification::{Channel, DeliveryStatus, Notification},
  store::LmsStore,
};
use lectern_notify::sender::ChannelSender;
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// If set, restrict to records in this state (`pending`|`sent`|`failed`).
  pub status: Option<DeliveryStatus>,
}

/// `GET /api/notifications[?status=failed]`
pub async fn list<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  let notifications = state
    .store
    .list_notifications(params.status)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(notifications))
}

// ─── Direct sends ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendEmailBody {
  pub to:      Option<String>,
  pub subject: Option<String>,
  pub text:    Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
  pub to:   Option<String>,
  pub text: Option<String>,
}

fn require(field: Option<String>, name: &str) -> Result<String, ApiError> {
  field.ok_or_else(|| ApiError::BadRequest(format!("{name} required")))
}

fn respond(record: Notification) -> impl IntoResponse {
  let status = if record.status == DeliveryStatus::Sent {
    StatusCode::OK
  } else {
    StatusCode::INTERNAL_SERVER_ERROR
  };
  (status, Json(record))
}

/// `POST /api/notifications/send-email`
pub async fn send_email<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
  Json(body): Json<SendEmailBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  let to = require(body.to, "to")?;
  let subject = require(body.subject, "subject")?;

  let record = state
    .dispatcher
    .send(
      Channel::Email,
      &to,
      Some(&subject),
      body.text.as_deref().unwrap_or_default(),
    )
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(respond(record))
}

/// `POST /api/notifications/send-chat`
pub async fn send_chat<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
  Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  let to = require(body.to, "to")?;
  let text = require(body.text, "text")?;

  let record = state
    .dispatcher
    .send(Channel::Chat, &to, None, &text)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(respond(record))
}

/// `POST /api/notifications/send-sms`
pub async fn send_sms<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
  Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  let to = require(body.to, "to")?;
  let text = require(body.text, "text")?;

  let record = state
    .dispatcher
    .send(Channel::Sms, &to, None, &text)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(respond(record))
}
