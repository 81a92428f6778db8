//! HTTP surface for Lectern.
//!
//! Exposes an axum [`Router`] with the webhook receiver, the local-mirror
//! read endpoints, and the direct notification-send endpoints, all backed by
//! any [`LmsStore`]. Transport auth is the gateway's responsibility, not
//! this service's.

pub mod courses;
pub mod error;
pub mod notifications;
pub mod webhooks;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  routing::{get, post},
};
use lectern_core::store::LmsStore;
use lectern_lms::LmsSettings;
use lectern_notify::{
  Dispatcher,
  sender::{ChannelSender, ChatSettings, EmailSettings, SmsSettings},
};
use lectern_sync::{SchedulerHandle, SchedulerSettings};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `LECTERN_*` environment variables. Read once at startup.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub sync:       SchedulerSettings,
  pub lms:        LmsSettings,
  pub email:      EmailSettings,
  pub chat:       ChatSettings,
  pub sms:        SmsSettings,
  /// Bound on each channel-sender request, in seconds.
  #[serde(default = "default_send_timeout_secs")]
  pub send_timeout_secs: u64,
}

fn default_send_timeout_secs() -> u64 { 30 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, E, C, M> {
  pub store:      Arc<S>,
  pub dispatcher: Arc<Dispatcher<S, E, C, M>>,
  pub scheduler:  SchedulerHandle,
}

// Manual impl: `derive(Clone)` would demand Clone of every type parameter,
// but everything here is behind an Arc or already a handle.
impl<S, E, C, M> Clone for AppState<S, E, C, M> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      dispatcher: self.dispatcher.clone(),
      scheduler:  self.scheduler.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the service.
pub fn router<S, E, C, M>(state: AppState<S, E, C, M>) -> Router
where
  S: LmsStore + 'static,
  E: ChannelSender + 'static,
  C: ChannelSender + 'static,
  M: ChannelSender + 'static,
{
  Router::new()
    .route("/api/health", get(health))
    .route("/api/webhooks/lms", post(webhooks::receive::<S, E, C, M>))
    // Local mirror
    .route("/api/courses", get(courses::list::<S, E, C, M>))
    .route(
      "/api/courses/{id}/assignments",
      get(courses::assignments::<S, E, C, M>),
    )
    .route(
      "/api/courses/{id}/roster",
      get(courses::roster::<S, E, C, M>),
    )
    // Notifications
    .route("/api/notifications", get(notifications::list::<S, E, C, M>))
    .route(
      "/api/notifications/send-email",
      post(notifications::send_email::<S, E, C, M>),
    )
    .route(
      "/api/notifications/send-chat",
      post(notifications::send_chat::<S, E, C, M>),
    )
    .route(
      "/api/notifications/send-sms",
      post(notifications::send_sms::<S, E, C, M>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<serde_json::Value> { Json(json!({ "ok": true })) }

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use lectern_core::{
    course::{NewAssignment, NewCourse},
    notification::DeliveryStatus,
    report::SyncReport,
  };
  use lectern_store_sqlite::SqliteStore;
  use lectern_sync::{Reconcile, Scheduler};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  // ── Stubs ───────────────────────────────────────────────────────────────

  #[derive(Clone, Default)]
  struct StubSender {
    fail: bool,
  }

  impl ChannelSender for StubSender {
    async fn deliver(
      &self,
      _recipient: &str,
      _subject: Option<&str>,
      _body: &str,
    ) -> lectern_notify::Result<()> {
      if self.fail {
        return Err(lectern_notify::Error::Delivery("relay down".to_string()));
      }
      Ok(())
    }
  }

  struct StubEngine {
    runs:  AtomicUsize,
    hints: Mutex<Vec<Option<Uuid>>>,
  }

  impl Reconcile for StubEngine {
    async fn run_once(&self, user_hint: Option<Uuid>) -> SyncReport {
      self.runs.fetch_add(1, Ordering::SeqCst);
      self.hints.lock().unwrap().push(user_hint);
      SyncReport::default()
    }
  }

  type TestState = AppState<SqliteStore, StubSender, StubSender, StubSender>;

  async fn make_state(chat_fails: bool) -> (TestState, Arc<StubEngine>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let dispatcher = Arc::new(Dispatcher::new(
      store.clone(),
      StubSender::default(),
      StubSender { fail: chat_fails },
      StubSender::default(),
    ));
    let engine = Arc::new(StubEngine {
      runs:  AtomicUsize::new(0),
      hints: Mutex::new(Vec::new()),
    });
    let scheduler = Scheduler::spawn(
      engine.clone(),
      lectern_sync::SchedulerSettings {
        poll_interval_secs: 3600,
        pass_timeout_secs:  None,
      },
    );
    (
      AppState { store, dispatcher, scheduler },
      engine,
    )
  }

  async fn request(
    state: TestState,
    method: &str,
    uri: &str,
    body: &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if !body.is_empty() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Health ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_returns_ok() {
    let (state, _) = make_state(false).await;
    let resp = request(state, "GET", "/api/health", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, serde_json::json!({ "ok": true }));
  }

  // ── Webhook ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn webhook_responds_immediately_and_requests_a_pass() {
    let (state, engine) = make_state(false).await;

    let resp =
      request(state, "POST", "/api/webhooks/lms", r#"{"event":"coursework"}"#)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The pass runs on the scheduler loop, not the request path.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(engine.runs.load(Ordering::SeqCst), 1);
    assert_eq!(engine.hints.lock().unwrap()[0], None);
  }

  #[tokio::test]
  async fn webhook_user_id_becomes_the_credential_hint() {
    let (state, engine) = make_state(false).await;
    let owner = Uuid::new_v4();

    let body = format!(r#"{{"userId":"{owner}"}}"#);
    let resp = request(state, "POST", "/api/webhooks/lms", &body).await;
    assert_eq!(resp.status(), StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(engine.hints.lock().unwrap()[0], Some(owner));
  }

  // ── Mirror reads ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn courses_read_from_the_local_mirror() {
    let (state, _) = make_state(false).await;

    state
      .store
      .upsert_course(NewCourse {
        external_id:       "C1".into(),
        name:              "Math".into(),
        section:           None,
        description:       None,
        owner_external_id: None,
      })
      .await
      .unwrap();
    state
      .store
      .insert_assignment_if_absent(NewAssignment {
        external_id:        "A1".into(),
        course_external_id: "C1".into(),
        title:              "Quiz 1".into(),
        description:        None,
        due_date:           None,
      })
      .await
      .unwrap();
    state.store.upsert_enrollment("alice@example.edu", "C1").await.unwrap();

    let resp = request(state.clone(), "GET", "/api/courses", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    let resp =
      request(state.clone(), "GET", "/api/courses/C1/assignments", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let assignments = json_body(resp).await;
    assert_eq!(assignments[0]["external_id"], "A1");

    let resp = request(state, "GET", "/api/courses/C1/roster", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let roster = json_body(resp).await;
    assert_eq!(roster[0]["student_external_id"], "alice@example.edu");
  }

  #[tokio::test]
  async fn unknown_course_returns_404() {
    let (state, _) = make_state(false).await;
    let resp = request(state, "GET", "/api/courses/C9/assignments", "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Direct sends ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn send_email_persists_and_returns_the_record() {
    let (state, _) = make_state(false).await;

    let body = r#"{"to":"alice@example.edu","subject":"Hello","text":"Hi"}"#;
    let resp =
      request(state.clone(), "POST", "/api/notifications/send-email", body)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let record = json_body(resp).await;
    assert_eq!(record["status"], "sent");
    assert_eq!(record["channel"], "email");

    let stored = state.store.list_notifications(None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, DeliveryStatus::Sent);
  }

  #[tokio::test]
  async fn send_email_without_subject_is_rejected() {
    let (state, _) = make_state(false).await;

    let body = r#"{"to":"alice@example.edu"}"#;
    let resp =
      request(state.clone(), "POST", "/api/notifications/send-email", body)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Nothing was recorded for a rejected request.
    assert!(state.store.list_notifications(None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn failed_chat_send_returns_500_with_failed_record() {
    let (state, _) = make_state(true).await;

    let body = r#"{"to":"room-42","text":"ping"}"#;
    let resp =
      request(state.clone(), "POST", "/api/notifications/send-chat", body)
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let record = json_body(resp).await;
    assert_eq!(record["status"], "failed");
    assert!(
      record["error"].as_str().unwrap().contains("relay down"),
      "error detail carried on the record"
    );

    let failed = state
      .store
      .list_notifications(Some(DeliveryStatus::Failed))
      .await
      .unwrap();
    assert_eq!(failed.len(), 1);
  }

  #[tokio::test]
  async fn notifications_list_filters_by_status() {
    let (state, _) = make_state(false).await;

    request(
      state.clone(),
      "POST",
      "/api/notifications/send-sms",
      r#"{"to":"+15550100","text":"hi"}"#,
    )
    .await;

    let resp =
      request(state.clone(), "GET", "/api/notifications?status=sent", "").await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    let resp =
      request(state, "GET", "/api/notifications?status=failed", "").await;
    assert!(json_body(resp).await.as_array().unwrap().is_empty());
  }
}
