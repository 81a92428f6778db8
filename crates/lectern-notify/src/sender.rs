//! Channel senders — thin clients for the external delivery APIs.
//!
//! Each sender accepts a recipient and message and reports success or an
//! error; the dispatcher neither knows nor cares what is behind the trait.

use std::{future::Future, time::Duration};

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{Error, Result};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A single delivery channel. One call is one attempt; retries are the
/// caller's decision (and produce new Notification records, never reuse).
pub trait ChannelSender: Send + Sync {
  fn deliver<'a>(
    &'a self,
    recipient: &'a str,
    subject: Option<&'a str>,
    body: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

async fn check(resp: reqwest::Response) -> Result<()> {
  let status = resp.status();
  if status.is_success() {
    return Ok(());
  }
  let detail = resp.text().await.unwrap_or_default();
  Err(Error::Api { status, detail })
}

// ─── Email ───────────────────────────────────────────────────────────────────

/// Settings for the HTTP mail relay.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
  /// Full URL of the relay's send endpoint.
  pub endpoint: String,
  pub token:    String,
  /// RFC 5322 From address stamped on every message.
  pub from:     String,
}

/// Sends mail through an HTTP relay API.
#[derive(Clone)]
pub struct EmailSender {
  http:     Client,
  settings: EmailSettings,
}

impl EmailSender {
  pub fn new(settings: EmailSettings, timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(Self { http, settings })
  }
}

impl ChannelSender for EmailSender {
  async fn deliver(
    &self,
    recipient: &str,
    subject: Option<&str>,
    body: &str,
  ) -> Result<()> {
    let resp = self
      .http
      .post(&self.settings.endpoint)
      .bearer_auth(&self.settings.token)
      .json(&json!({
        "from":    self.settings.from,
        "to":      recipient,
        "subject": subject.unwrap_or_default(),
        "text":    body,
      }))
      .send()
      .await?;
    check(resp).await
  }
}

// ─── Chat ────────────────────────────────────────────────────────────────────

/// Settings for the chat-bot message API.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
  /// Bot API root, e.g. `https://api.example.org`.
  pub endpoint:  String,
  pub bot_token: String,
}

/// Sends messages as a chat bot. The recipient is the chat id; subjects do
/// not exist on this channel and are ignored.
#[derive(Clone)]
pub struct ChatSender {
  http:     Client,
  send_url: String,
}

impl ChatSender {
  pub fn new(settings: ChatSettings, timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    let send_url = format!(
      "{}/bot{}/sendMessage",
      settings.endpoint.trim_end_matches('/'),
      settings.bot_token
    );
    Ok(Self { http, send_url })
  }
}

impl ChannelSender for ChatSender {
  async fn deliver(
    &self,
    recipient: &str,
    _subject: Option<&str>,
    body: &str,
  ) -> Result<()> {
    let resp = self
      .http
      .post(&self.send_url)
      .json(&json!({ "chat_id": recipient, "text": body }))
      .send()
      .await?;
    check(resp).await
  }
}

// ─── SMS ─────────────────────────────────────────────────────────────────────

/// Settings for the SMS/WhatsApp-style message API.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsSettings {
  /// API root, e.g. `https://api.example.com/2010-04-01`.
  pub endpoint:    String,
  pub account_sid: String,
  pub auth_token:  String,
  /// E.164 sender number.
  pub from:        String,
}

/// Sends text messages through an account-scoped messages API.
#[derive(Clone)]
pub struct SmsSender {
  http:     Client,
  send_url: String,
  settings: SmsSettings,
}

impl SmsSender {
  pub fn new(settings: SmsSettings, timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    let send_url = format!(
      "{}/Accounts/{}/Messages.json",
      settings.endpoint.trim_end_matches('/'),
      settings.account_sid
    );
    Ok(Self { http, send_url, settings })
  }
}

impl ChannelSender for SmsSender {
  async fn deliver(
    &self,
    recipient: &str,
    _subject: Option<&str>,
    body: &str,
  ) -> Result<()> {
    let resp = self
      .http
      .post(&self.send_url)
      .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
      .form(&[
        ("From", self.settings.from.as_str()),
        ("To", recipient),
        ("Body", body),
      ])
      .send()
      .await?;
    check(resp).await
  }
}
