//! [`Dispatcher`] — the owner of the Notification lifecycle.
//!
//! Ordering is load-bearing: the `pending` row is written *before* the
//! delivery attempt, so a crash mid-send leaves a visible `pending` record
//! rather than a silently lost notification. Exactly one attempt per record;
//! a retry is a new dispatch and a new record.

use std::sync::Arc;

use lectern_core::{
  course::{Assignment, Course},
  notification::{Channel, DeliveryStatus, NewNotification, Notification},
  store::LmsStore,
};

use crate::sender::ChannelSender;

// ─── Fan-out summary ─────────────────────────────────────────────────────────

/// Per-recipient outcome counts for one fan-out batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
  pub sent:   usize,
  pub failed: usize,
}

// ─── Message template ────────────────────────────────────────────────────────

fn assignment_subject(assignment: &Assignment) -> String {
  format!("New assignment: {}", assignment.title)
}

fn assignment_body(course: &Course, assignment: &Assignment) -> String {
  let due = assignment
    .due_date
    .map(|d| d.to_string())
    .unwrap_or_else(|| "no due date".to_string());
  format!(
    "A new assignment was posted in {}: {}\n\n\
     Description: {}\n\n\
     Due: {due}",
    course.name,
    assignment.title,
    assignment.description.as_deref().unwrap_or(""),
  )
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Fans messages out through the configured channel senders, recording every
/// attempt in the store.
pub struct Dispatcher<S, E, C, M> {
  store: Arc<S>,
  email: E,
  chat:  C,
  sms:   M,
}

impl<S, E, C, M> Dispatcher<S, E, C, M>
where
  S: LmsStore,
  E: ChannelSender,
  C: ChannelSender,
  M: ChannelSender,
{
  pub fn new(store: Arc<S>, email: E, chat: C, sms: M) -> Self {
    Self { store, email, chat, sms }
  }

  /// Persist a `pending` record, attempt delivery exactly once, persist the
  /// terminal status, and return the finished record.
  ///
  /// Only store failures propagate; a delivery failure is an outcome, not an
  /// error.
  pub async fn send(
    &self,
    channel: Channel,
    recipient: &str,
    subject: Option<&str>,
    body: &str,
  ) -> Result<Notification, S::Error> {
    let mut record = self
      .store
      .add_notification(NewNotification {
        channel,
        recipient: recipient.to_owned(),
        subject:   subject.map(str::to_owned),
        body:      Some(body.to_owned()),
      })
      .await?;

    let attempt = match channel {
      Channel::Email => self.email.deliver(recipient, subject, body).await,
      Channel::Chat => self.chat.deliver(recipient, subject, body).await,
      Channel::Sms => self.sms.deliver(recipient, subject, body).await,
    };

    match attempt {
      Ok(()) => {
        self
          .store
          .mark_notification_sent(record.notification_id)
          .await?;
        record.status = DeliveryStatus::Sent;
      }
      Err(e) => {
        let detail = e.to_string();
        tracing::warn!(
          "delivery failed: channel={channel} recipient={recipient}: {detail}"
        );
        self
          .store
          .mark_notification_failed(record.notification_id, detail.clone())
          .await?;
        record.status = DeliveryStatus::Failed;
        record.error = Some(detail);
      }
    }

    Ok(record)
  }

  /// Email every enrolled student about a newly created assignment.
  ///
  /// One recipient's failure — delivery or store — never blocks the rest;
  /// everything is absorbed into the returned counts.
  pub async fn announce_assignment(
    &self,
    course: &Course,
    assignment: &Assignment,
    recipients: &[String],
  ) -> FanOut {
    let subject = assignment_subject(assignment);
    let body = assignment_body(course, assignment);

    let mut fan_out = FanOut::default();
    for recipient in recipients {
      match self
        .send(Channel::Email, recipient, Some(&subject), &body)
        .await
      {
        Ok(record) if record.status == DeliveryStatus::Sent => fan_out.sent += 1,
        Ok(_) => fan_out.failed += 1,
        Err(e) => {
          tracing::warn!(
            "could not record notification for {recipient}: {e}"
          );
          fan_out.failed += 1;
        }
      }
    }

    tracing::info!(
      "fan-out for assignment {}: {} sent, {} failed of {}",
      assignment.external_id,
      fan_out.sent,
      fan_out.failed,
      recipients.len()
    );
    fan_out
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
