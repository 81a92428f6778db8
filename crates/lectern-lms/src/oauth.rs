//! Refresh-grant client for the external token endpoint.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{Error, Result};

/// Wire shape of a successful token-endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
  /// Lifetime in seconds; absent means the token does not expire.
  expires_in:   Option<i64>,
}

/// A refreshed access token with its absolute expiry, ready to persist.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
  pub access_token: String,
  pub expires_at:   Option<DateTime<Utc>>,
}

/// Client for the OAuth token endpoint. Only the refresh grant is needed
/// here; the authorization-code exchange lives with the session handshake,
/// outside this service.
#[derive(Clone)]
pub struct TokenEndpoint {
  http:          Client,
  token_url:     String,
  client_id:     String,
  client_secret: String,
}

impl TokenEndpoint {
  pub fn new(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    timeout: Duration,
  ) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      http,
      token_url: token_url.to_owned(),
      client_id: client_id.to_owned(),
      client_secret: client_secret.to_owned(),
    })
  }

  /// Exchange a refresh token for a new access token. One attempt; the
  /// caller does not retry a rejection.
  pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken> {
    let resp = self
      .http
      .post(&self.token_url)
      .form(&[
        ("client_id", self.client_id.as_str()),
        ("client_secret", self.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
      ])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::RefreshRejected(format!(
        "token endpoint → {}",
        resp.status()
      )));
    }

    let token: TokenResponse = resp.json().await?;
    let expires_at = token
      .expires_in
      .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

    Ok(RefreshedToken {
      access_token: token.access_token,
      expires_at,
    })
  }
}
