//! Webhook receiver for LMS push notifications.
//!
//! The contract is: answer fast, sync later. The handler only logs the
//! payload, hands the scheduler a run request, and returns — the pass itself
//! runs on the scheduler's loop, never on the request path.

use axum::{Json, extract::State};
use lectern_core::store::LmsStore;
use lectern_notify::sender::ChannelSender;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;

/// `POST /api/webhooks/lms`
///
/// Accepts any JSON payload. An optional `userId` field becomes the
/// credential fallback hint for the triggered pass.
pub async fn receive<S, E, C, M>(
  State(state): State<AppState<S, E, C, M>>,
  Json(payload): Json<serde_json::Value>,
) -> Json<serde_json::Value>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  let preview: String = payload.to_string().chars().take(300).collect();
  tracing::info!("lms webhook received: {preview}");

  let user_hint = payload
    .get("userId")
    .and_then(|v| v.as_str())
    .and_then(|s| Uuid::parse_str(s).ok());

  state.scheduler.trigger(user_hint);
  Json(json!({ "ok": true }))
}
