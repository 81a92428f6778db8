//! [`ReconciliationEngine`] — one full sync pass over the external LMS.
//!
//! The engine never errors out to its caller. A missing credential makes the
//! whole pass a no-op; everything below that is isolated per course and per
//! item, caught, and summarised in the returned [`SyncReport`].

use std::{future::Future, sync::Arc};

use lectern_core::{
  course::{NewAssignment, NewCourse},
  credential::SyncTarget,
  lms::{ApiSource, LmsApi, RemoteCourse, Resolution},
  report::SyncReport,
  store::{InsertOutcome, LmsStore},
};
use lectern_notify::{Dispatcher, sender::ChannelSender};
use uuid::Uuid;

// ─── Reconcile trait ─────────────────────────────────────────────────────────

/// The scheduler's view of the engine: run one pass, get a report, never an
/// error.
pub trait Reconcile: Send + Sync {
  fn run_once(
    &self,
    user_hint: Option<Uuid>,
  ) -> impl Future<Output = SyncReport> + Send + '_;
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Orchestrates one reconciliation pass.
pub struct ReconciliationEngine<S, A, E, C, M> {
  store:      Arc<S>,
  source:     Arc<A>,
  dispatcher: Arc<Dispatcher<S, E, C, M>>,
}

impl<S, A, E, C, M> ReconciliationEngine<S, A, E, C, M>
where
  S: LmsStore,
  A: ApiSource,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  pub fn new(
    store: Arc<S>,
    source: Arc<A>,
    dispatcher: Arc<Dispatcher<S, E, C, M>>,
  ) -> Self {
    Self { store, source, dispatcher }
  }

  async fn run(&self, user_hint: Option<Uuid>) -> SyncReport {
    // Cross-roster sync needs the elevated service scope; a user credential
    // is only a fallback when a webhook named one.
    let mut chain = vec![SyncTarget::System];
    if let Some(owner) = user_hint {
      chain.push(SyncTarget::User(owner));
    }

    let (api, source) = match self.source.resolve_chain(&chain).await {
      Resolution::Resolved { api, source } => (api, source),
      Resolution::Unavailable => {
        tracing::debug!("no usable credential; skipping pass");
        return SyncReport::default();
      }
    };

    let mut report = SyncReport {
      credential: Some(source),
      ..SyncReport::default()
    };

    let courses = match api.list_courses().await {
      Ok(courses) => courses,
      Err(e) => {
        report.errors.push(format!("list courses: {e}"));
        tracing::warn!("pass aborted, could not list courses: {e}");
        return report;
      }
    };

    for remote in &courses {
      report.courses_seen += 1;
      self.sync_course(&api, remote, &mut report).await;
    }

    tracing::info!(
      "pass complete: {} courses, {} new assignments, {} notifications sent, \
       {} errors",
      report.courses_seen,
      report.assignments_created,
      report.notifications_sent,
      report.errors.len()
    );
    report
  }

  /// Mirror one course: upsert, roster, coursework, fan-out. Failures land
  /// in the report and never spill over to other courses.
  async fn sync_course(
    &self,
    api: &A::Api,
    remote: &RemoteCourse,
    report: &mut SyncReport,
  ) {
    let course = match self
      .store
      .upsert_course(NewCourse {
        external_id:       remote.id.clone(),
        name:              remote.name.clone(),
        section:           remote.section.clone(),
        description:       remote.description.clone(),
        owner_external_id: remote.owner_id.clone(),
      })
      .await
    {
      Ok(course) => course,
      Err(e) => {
        report.courses_failed += 1;
        report.errors.push(format!("upsert course {}: {e}", remote.id));
        return;
      }
    };

    // Roster first, so a brand-new course notifies its students about
    // coursework discovered in the same pass.
    match api.list_roster(&course.external_id).await {
      Ok(students) => {
        for student in students {
          if let Err(e) = self
            .store
            .upsert_enrollment(&student.student_id, &course.external_id)
            .await
          {
            report.errors.push(format!(
              "enroll {} in {}: {e}",
              student.student_id, course.external_id
            ));
          }
        }
      }
      Err(e) => {
        report
          .errors
          .push(format!("roster {}: {e}", course.external_id));
      }
    }

    let coursework = match api.list_coursework(&course.external_id).await {
      Ok(items) => items,
      Err(e) => {
        report.courses_failed += 1;
        report
          .errors
          .push(format!("coursework {}: {e}", course.external_id));
        return;
      }
    };

    for item in coursework {
      // Create-then-notify: the store's uniqueness constraint decides the
      // race, so a concurrent pass observing `Exists` must stay silent.
      let outcome = self
        .store
        .insert_assignment_if_absent(NewAssignment {
          external_id:        item.id.clone(),
          course_external_id: course.external_id.clone(),
          title:              item.title.clone(),
          description:        item.description.clone(),
          due_date:           item.due_date,
        })
        .await;

      match outcome {
        Ok(InsertOutcome::Created(assignment)) => {
          report.assignments_created += 1;
          report.fan_outs += 1;

          let recipients = match self.store.roster(&course.external_id).await {
            Ok(enrollments) => enrollments
              .into_iter()
              .map(|e| e.student_external_id)
              .collect::<Vec<_>>(),
            Err(e) => {
              report.errors.push(format!(
                "recipients for {}: {e}",
                course.external_id
              ));
              Vec::new()
            }
          };

          let fan_out = self
            .dispatcher
            .announce_assignment(&course, &assignment, &recipients)
            .await;
          report.notifications_sent += fan_out.sent;
          report.notifications_failed += fan_out.failed;
        }
        Ok(InsertOutcome::Exists) => {}
        Err(e) => {
          report.errors.push(format!("assignment {}: {e}", item.id));
        }
      }
    }
  }
}

impl<S, A, E, C, M> Reconcile for ReconciliationEngine<S, A, E, C, M>
where
  S: LmsStore,
  A: ApiSource,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  async fn run_once(&self, user_hint: Option<Uuid>) -> SyncReport {
    self.run(user_hint).await
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  use chrono::NaiveDate;
  use lectern_core::{
    credential::CredentialSource,
    lms::{RemoteCourseWork, RemoteStudent},
    notification::{Channel, DeliveryStatus},
  };
  use lectern_store_sqlite::SqliteStore;

  // ── Stub external LMS ─────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("stub api failure")]
  struct StubApiError;

  #[derive(Clone, Default)]
  struct StubApi {
    courses:             Vec<RemoteCourse>,
    coursework:          HashMap<String, Vec<RemoteCourseWork>>,
    roster:              HashMap<String, Vec<RemoteStudent>>,
    fail_coursework_for: Option<String>,
  }

  impl LmsApi for StubApi {
    type Error = StubApiError;

    async fn list_courses(&self) -> Result<Vec<RemoteCourse>, StubApiError> {
      Ok(self.courses.clone())
    }

    async fn list_coursework(
      &self,
      course_id: &str,
    ) -> Result<Vec<RemoteCourseWork>, StubApiError> {
      if self.fail_coursework_for.as_deref() == Some(course_id) {
        return Err(StubApiError);
      }
      Ok(self.coursework.get(course_id).cloned().unwrap_or_default())
    }

    async fn list_roster(
      &self,
      course_id: &str,
    ) -> Result<Vec<RemoteStudent>, StubApiError> {
      Ok(self.roster.get(course_id).cloned().unwrap_or_default())
    }
  }

  struct StubSource {
    api:    StubApi,
    system: bool,
    user:   bool,
  }

  impl ApiSource for StubSource {
    type Api = StubApi;

    async fn resolve(&self, target: SyncTarget) -> Resolution<StubApi> {
      let accepted = match target {
        SyncTarget::System => self.system,
        SyncTarget::User(_) => self.user,
      };
      if !accepted {
        return Resolution::Unavailable;
      }
      Resolution::Resolved {
        api:    self.api.clone(),
        source: match target {
          SyncTarget::System => CredentialSource::Service,
          SyncTarget::User(owner_id) => CredentialSource::User { owner_id },
        },
      }
    }
  }

  #[derive(Clone, Default)]
  struct OkSender;

  impl ChannelSender for OkSender {
    async fn deliver(
      &self,
      _recipient: &str,
      _subject: Option<&str>,
      _body: &str,
    ) -> lectern_notify::Result<()> {
      Ok(())
    }
  }

  // ── Fixtures ──────────────────────────────────────────────────────────────

  type TestEngine =
    ReconciliationEngine<SqliteStore, StubSource, OkSender, OkSender, OkSender>;

  /// One course "Math" with one coursework item "Quiz 1" and two students.
  fn scenario_api() -> StubApi {
    StubApi {
      courses: vec![RemoteCourse {
        id:          "C1".into(),
        name:        "Math".into(),
        section:     Some("A".into()),
        description: None,
        owner_id:    Some("teacher@example.edu".into()),
      }],
      coursework: HashMap::from([(
        "C1".to_string(),
        vec![RemoteCourseWork {
          id:          "A1".into(),
          title:       "Quiz 1".into(),
          description: Some("covers chapter 3".into()),
          due_date:    NaiveDate::from_ymd_opt(2025, 2, 1),
        }],
      )]),
      roster: HashMap::from([(
        "C1".to_string(),
        vec![
          RemoteStudent { student_id: "alice@example.edu".into() },
          RemoteStudent { student_id: "bob@example.edu".into() },
        ],
      )]),
      fail_coursework_for: None,
    }
  }

  async fn engine_with(api: StubApi, system: bool, user: bool) -> (Arc<SqliteStore>, Arc<TestEngine>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let dispatcher =
      Arc::new(Dispatcher::new(store.clone(), OkSender, OkSender, OkSender));
    let source = Arc::new(StubSource { api, system, user });
    let engine =
      Arc::new(ReconciliationEngine::new(store.clone(), source, dispatcher));
    (store, engine)
  }

  // ── Scenario ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn first_pass_mirrors_and_notifies() {
    let (store, engine) = engine_with(scenario_api(), true, false).await;

    let report = engine.run_once(None).await;
    assert_eq!(report.credential, Some(CredentialSource::Service));
    assert_eq!(report.courses_seen, 1);
    assert_eq!(report.courses_failed, 0);
    assert_eq!(report.assignments_created, 1);
    assert_eq!(report.fan_outs, 1);
    assert_eq!(report.notifications_sent, 2);
    assert_eq!(report.notifications_failed, 0);
    assert!(report.errors.is_empty());

    let course = store.get_course("C1").await.unwrap().unwrap();
    assert_eq!(course.name, "Math");

    let assignments = store.list_assignments("C1").await.unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].external_id, "A1");

    let mut notifications = store.list_notifications(None).await.unwrap();
    assert_eq!(notifications.len(), 2);
    notifications.sort_by(|a, b| a.recipient.cmp(&b.recipient));
    assert_eq!(notifications[0].recipient, "alice@example.edu");
    assert_eq!(notifications[1].recipient, "bob@example.edu");
    for n in &notifications {
      assert_eq!(n.channel, Channel::Email);
      assert_eq!(n.status, DeliveryStatus::Sent);
      assert!(n.subject.as_deref().unwrap().contains("Quiz 1"));
    }
  }

  #[tokio::test]
  async fn second_pass_is_idempotent() {
    let (store, engine) = engine_with(scenario_api(), true, false).await;

    engine.run_once(None).await;
    let second = engine.run_once(None).await;

    assert_eq!(second.courses_seen, 1);
    assert_eq!(second.assignments_created, 0);
    assert_eq!(second.fan_outs, 0);
    assert_eq!(second.notifications_sent, 0);

    assert_eq!(store.list_assignments("C1").await.unwrap().len(), 1);
    assert_eq!(store.list_notifications(None).await.unwrap().len(), 2);
    // Roster re-syncs are no-ops too.
    assert_eq!(store.roster("C1").await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn no_credential_is_a_silent_noop() {
    let (store, engine) = engine_with(scenario_api(), false, false).await;

    let report = engine.run_once(None).await;
    assert!(report.skipped());
    assert_eq!(report.courses_seen, 0);
    assert!(store.list_courses().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn user_hint_is_the_fallback_credential() {
    let (_store, engine) = engine_with(scenario_api(), false, true).await;

    // Without a hint the chain is system-only and nothing resolves.
    assert!(engine.run_once(None).await.skipped());

    let owner = Uuid::new_v4();
    let report = engine.run_once(Some(owner)).await;
    assert_eq!(
      report.credential,
      Some(CredentialSource::User { owner_id: owner })
    );
    assert_eq!(report.courses_seen, 1);
  }

  #[tokio::test]
  async fn one_failing_course_does_not_block_the_rest() {
    let mut api = scenario_api();
    api.courses.push(RemoteCourse {
      id:          "C2".into(),
      name:        "Physics".into(),
      section:     None,
      description: None,
      owner_id:    None,
    });
    api.coursework.insert(
      "C2".to_string(),
      vec![RemoteCourseWork {
        id:          "B1".into(),
        title:       "Lab report".into(),
        description: None,
        due_date:    None,
      }],
    );
    api.fail_coursework_for = Some("C1".to_string());

    let (store, engine) = engine_with(api, true, false).await;
    let report = engine.run_once(None).await;

    assert_eq!(report.courses_seen, 2);
    assert_eq!(report.courses_failed, 1);
    assert_eq!(report.errors.len(), 1);
    // The healthy course still synced fully.
    assert_eq!(report.assignments_created, 1);
    assert_eq!(store.list_assignments("C2").await.unwrap().len(), 1);
    assert!(store.get_course("C1").await.unwrap().is_some());
  }

  #[tokio::test]
  async fn concurrent_passes_notify_exactly_once() {
    let (store, engine) = engine_with(scenario_api(), true, false).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
      let engine = engine.clone();
      handles.push(tokio::spawn(async move { engine.run_once(None).await }));
    }

    let mut created_total = 0;
    for h in handles {
      created_total += h.await.unwrap().assignments_created;
    }

    assert_eq!(created_total, 1, "one pass wins the create");
    assert_eq!(store.list_assignments("C1").await.unwrap().len(), 1);
    // One fan-out batch: two recipients, nothing duplicated.
    assert_eq!(store.list_notifications(None).await.unwrap().len(), 2);
  }
}
