//! [`Scheduler`] — serialized reconciliation on a timer and on demand.
//!
//! A single consumer loop owns the engine, so at-most-one-concurrent-pass is
//! a structural property rather than a flag. Run requests arriving mid-pass
//! land in a bounded queue of depth 1: the first is held as the single
//! pending follow-up, the rest coalesce into it and are dropped. There is no
//! mid-pass cancellation beyond the optional pass timeout.

use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use tokio::{
  sync::mpsc,
  time::{self, MissedTickBehavior},
};
use uuid::Uuid;

use crate::engine::Reconcile;

// ─── Settings ────────────────────────────────────────────────────────────────

/// Scheduling knobs, read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
  /// Seconds between timer-driven passes.
  #[serde(default = "default_poll_interval_secs")]
  pub poll_interval_secs: u64,
  /// Upper bound on one pass; an elapsed pass is abandoned and logged so a
  /// stalled external API cannot hold the slot forever. Absent means
  /// unbounded.
  #[serde(default)]
  pub pass_timeout_secs: Option<u64>,
}

fn default_poll_interval_secs() -> u64 { 300 }

impl Default for SchedulerSettings {
  fn default() -> Self {
    Self {
      poll_interval_secs: default_poll_interval_secs(),
      pass_timeout_secs:  None,
    }
  }
}

// ─── Trigger handle ──────────────────────────────────────────────────────────

/// A run request from outside the timer (webhook, operator).
struct SyncTrigger {
  user_hint: Option<Uuid>,
}

/// Cheap-to-clone handle for requesting an immediate pass.
#[derive(Clone)]
pub struct SchedulerHandle {
  tx: mpsc::Sender<SyncTrigger>,
}

impl SchedulerHandle {
  /// Request a pass as soon as the loop is free. Returns `false` when the
  /// request coalesced into an already-pending one (or the scheduler is
  /// gone); either way a pass will run.
  pub fn trigger(&self, user_hint: Option<Uuid>) -> bool {
    match self.tx.try_send(SyncTrigger { user_hint }) {
      Ok(()) => true,
      Err(mpsc::error::TrySendError::Full(_)) => {
        tracing::debug!("run request coalesced into pending trigger");
        false
      }
      Err(mpsc::error::TrySendError::Closed(_)) => {
        tracing::warn!("scheduler loop is gone; trigger dropped");
        false
      }
    }
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Spawns the consumer loop and hands back the trigger handle.
pub struct Scheduler;

impl Scheduler {
  pub fn spawn<R: Reconcile + 'static>(
    engine: Arc<R>,
    settings: SchedulerSettings,
  ) -> SchedulerHandle {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(run_loop(engine, rx, settings));
    SchedulerHandle { tx }
  }
}

async fn run_loop<R: Reconcile>(
  engine: Arc<R>,
  mut rx: mpsc::Receiver<SyncTrigger>,
  settings: SchedulerSettings,
) {
  let period = Duration::from_secs(settings.poll_interval_secs);
  // First timer pass one full interval after startup; webhooks can force an
  // earlier one.
  let mut interval = time::interval_at(time::Instant::now() + period, period);
  interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

  let timeout = settings.pass_timeout_secs.map(Duration::from_secs);

  loop {
    let user_hint = tokio::select! {
      _ = interval.tick() => None,
      trigger = rx.recv() => match trigger {
        Some(t) => t.user_hint,
        // All handles dropped; nothing can ever request a pass again.
        None => break,
      },
    };

    run_pass(&*engine, user_hint, timeout).await;
  }
}

async fn run_pass<R: Reconcile>(
  engine: &R,
  user_hint: Option<Uuid>,
  timeout: Option<Duration>,
) {
  let pass = engine.run_once(user_hint);
  let report = match timeout {
    Some(bound) => match time::timeout(bound, pass).await {
      Ok(report) => report,
      Err(_) => {
        tracing::warn!("pass exceeded {}s and was abandoned", bound.as_secs());
        return;
      }
    },
    None => pass.await,
  };

  if report.skipped() {
    tracing::debug!("pass skipped: no credential");
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use lectern_core::report::SyncReport;

  /// Counts passes and records the hints they ran with.
  struct StubEngine {
    runs:  AtomicUsize,
    hints: Mutex<Vec<Option<Uuid>>>,
    delay: Duration,
  }

  impl StubEngine {
    fn new(delay: Duration) -> Arc<Self> {
      Arc::new(Self {
        runs:  AtomicUsize::new(0),
        hints: Mutex::new(Vec::new()),
        delay,
      })
    }

    fn runs(&self) -> usize { self.runs.load(Ordering::SeqCst) }
  }

  impl Reconcile for StubEngine {
    async fn run_once(&self, user_hint: Option<Uuid>) -> SyncReport {
      self.runs.fetch_add(1, Ordering::SeqCst);
      self.hints.lock().unwrap().push(user_hint);
      tokio::time::sleep(self.delay).await;
      SyncReport::default()
    }
  }

  fn settings(poll: u64, timeout: Option<u64>) -> SchedulerSettings {
    SchedulerSettings {
      poll_interval_secs: poll,
      pass_timeout_secs:  timeout,
    }
  }

  #[tokio::test(start_paused = true)]
  async fn trigger_runs_a_pass_with_its_hint() {
    let engine = StubEngine::new(Duration::from_millis(10));
    let handle = Scheduler::spawn(engine.clone(), settings(3600, None));

    let owner = Uuid::new_v4();
    assert!(handle.trigger(Some(owner)));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(engine.runs(), 1);
    assert_eq!(engine.hints.lock().unwrap()[0], Some(owner));
  }

  #[tokio::test(start_paused = true)]
  async fn interval_fires_without_external_triggers() {
    let engine = StubEngine::new(Duration::from_millis(10));
    let _handle = Scheduler::spawn(engine.clone(), settings(300, None));

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(engine.runs(), 1);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(engine.runs(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn mid_pass_triggers_coalesce_into_one_followup() {
    // A long-running pass; everything arriving meanwhile must fold into a
    // single follow-up.
    let engine = StubEngine::new(Duration::from_secs(10));
    let handle = Scheduler::spawn(engine.clone(), settings(3600, None));

    assert!(handle.trigger(None));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.runs(), 1, "first pass is running");

    // First mid-pass request queues; the rest coalesce.
    assert!(handle.trigger(None));
    assert!(!handle.trigger(None));
    assert!(!handle.trigger(None));
    assert!(!handle.trigger(None));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(engine.runs(), 2, "exactly one follow-up pass");
  }

  #[tokio::test(start_paused = true)]
  async fn timed_out_pass_frees_the_slot() {
    let engine = StubEngine::new(Duration::from_secs(120));
    let handle = Scheduler::spawn(engine.clone(), settings(3600, Some(5)));

    assert!(handle.trigger(None));
    // Well past the timeout: the wedged pass has been abandoned.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.runs(), 1);

    // The loop is free again.
    assert!(handle.trigger(None));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(engine.runs(), 2);
  }
}
