//! [`CredentialResolver`] — turns a sync target into an authenticated client.
//!
//! Every failure mode below the trait boundary (missing key material, no
//! stored credential, a rejected refresh) collapses into
//! [`Resolution::Unavailable`]; a skipped pass is a normal outcome here, not
//! an error to propagate.

use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::Utc;
use lectern_core::{
  credential::{Credential, CredentialSource, SyncTarget},
  lms::{ApiSource, Resolution},
  store::LmsStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{client::LmsClient, oauth::TokenEndpoint, Result};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Connection settings for the external LMS and its token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LmsSettings {
  pub base_url:      String,
  pub token_url:     String,
  pub client_id:     String,
  pub client_secret: String,
  /// JSON file holding the domain-wide service key. Absent means per-user
  /// credentials are the only source.
  pub service_key_path: Option<PathBuf>,
  /// Bound on every outbound request, in seconds.
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl LmsSettings {
  fn timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

/// On-disk shape of the service key file.
#[derive(Deserialize)]
struct ServiceKey {
  /// Identity the key acts as; logged, never sent.
  client_email: String,
  /// Opaque long-lived token with cross-roster scope.
  token:        String,
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolves sync targets to ready-to-use [`LmsClient`]s.
///
/// The service credential is loaded from static key material on every
/// resolution; per-user credentials come from the store and are refreshed
/// through the token endpoint (exactly one attempt) when expired.
pub struct CredentialResolver<S> {
  store:          Arc<S>,
  settings:       LmsSettings,
  token_endpoint: TokenEndpoint,
}

impl<S: LmsStore> CredentialResolver<S> {
  pub fn new(store: Arc<S>, settings: LmsSettings) -> Result<Self> {
    let token_endpoint = TokenEndpoint::new(
      &settings.token_url,
      &settings.client_id,
      &settings.client_secret,
      settings.timeout(),
    )?;
    Ok(Self { store, settings, token_endpoint })
  }

  fn client(&self, token: String) -> Option<LmsClient> {
    match LmsClient::new(&self.settings.base_url, token, self.settings.timeout()) {
      Ok(client) => Some(client),
      Err(e) => {
        tracing::warn!("failed to build LMS client: {e}");
        None
      }
    }
  }

  async fn resolve_service(&self) -> Resolution<LmsClient> {
    let Some(path) = &self.settings.service_key_path else {
      tracing::debug!("no service key configured");
      return Resolution::Unavailable;
    };

    let raw = match tokio::fs::read_to_string(path).await {
      Ok(raw) => raw,
      Err(e) => {
        tracing::warn!("service key unreadable at {path:?}: {e}");
        return Resolution::Unavailable;
      }
    };

    let key: ServiceKey = match serde_json::from_str(&raw) {
      Ok(key) => key,
      Err(e) => {
        tracing::warn!("service key malformed at {path:?}: {e}");
        return Resolution::Unavailable;
      }
    };

    tracing::debug!("resolved service credential for {}", key.client_email);
    match self.client(key.token) {
      Some(api) => Resolution::Resolved {
        api,
        source: CredentialSource::Service,
      },
      None => Resolution::Unavailable,
    }
  }

  async fn resolve_user(&self, owner_id: Uuid) -> Resolution<LmsClient> {
    let credential = match self.store.latest_credential(owner_id).await {
      Ok(Some(c)) => c,
      Ok(None) => {
        tracing::debug!("no stored credential for owner {owner_id}");
        return Resolution::Unavailable;
      }
      Err(e) => {
        tracing::warn!("credential lookup failed for owner {owner_id}: {e}");
        return Resolution::Unavailable;
      }
    };

    let token = if credential.is_expired(Utc::now()) {
      match self.refresh(&credential).await {
        Some(token) => token,
        None => return Resolution::Unavailable,
      }
    } else {
      credential.access_token.clone()
    };

    match self.client(token) {
      Some(api) => Resolution::Resolved {
        api,
        source: CredentialSource::User { owner_id },
      },
      None => Resolution::Unavailable,
    }
  }

  /// One refresh attempt. Success persists the new token atomically before
  /// the client is handed out; any failure (rejection, transport, persist)
  /// makes the credential unavailable for this pass.
  async fn refresh(&self, credential: &Credential) -> Option<String> {
    let Some(refresh_token) = &credential.refresh_token else {
      tracing::debug!(
        "credential {} expired with no refresh token",
        credential.credential_id
      );
      return None;
    };

    let refreshed = match self.token_endpoint.refresh(refresh_token).await {
      Ok(r) => r,
      Err(e) => {
        tracing::warn!("refresh failed for owner {}: {e}", credential.owner_id);
        return None;
      }
    };

    if let Err(e) = self
      .store
      .apply_refresh(
        credential.credential_id,
        refreshed.access_token.clone(),
        refreshed.expires_at,
      )
      .await
    {
      tracing::warn!(
        "could not persist refreshed token for {}: {e}",
        credential.credential_id
      );
      return None;
    }

    Some(refreshed.access_token)
  }
}

impl<S: LmsStore> ApiSource for CredentialResolver<S> {
  type Api = LmsClient;

  async fn resolve(&self, target: SyncTarget) -> Resolution<LmsClient> {
    match target {
      SyncTarget::System => self.resolve_service().await,
      SyncTarget::User(owner_id) => self.resolve_user(owner_id).await,
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
