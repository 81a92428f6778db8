//! lectern-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, starts the reconciliation scheduler, and serves
//! the HTTP API.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use lectern_lms::CredentialResolver;
use lectern_notify::{
  Dispatcher,
  sender::{ChatSender, EmailSender, SmsSender},
};
use lectern_server::{AppState, ServerConfig};
use lectern_store_sqlite::SqliteStore;
use lectern_sync::{ReconciliationEngine, Scheduler};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Lectern LMS mirror & notification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("LECTERN").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // Channel senders and the dispatcher.
  let send_timeout = Duration::from_secs(server_cfg.send_timeout_secs);
  let dispatcher = Arc::new(Dispatcher::new(
    store.clone(),
    EmailSender::new(server_cfg.email.clone(), send_timeout)
      .context("failed to build email sender")?,
    ChatSender::new(server_cfg.chat.clone(), send_timeout)
      .context("failed to build chat sender")?,
    SmsSender::new(server_cfg.sms.clone(), send_timeout)
      .context("failed to build sms sender")?,
  ));

  // Reconciliation pipeline.
  let resolver = Arc::new(
    CredentialResolver::new(store.clone(), server_cfg.lms.clone())
      .context("failed to build credential resolver")?,
  );
  let engine = Arc::new(ReconciliationEngine::new(
    store.clone(),
    resolver,
    dispatcher.clone(),
  ));
  let scheduler = Scheduler::spawn(engine, server_cfg.sync.clone());

  // Build application state and serve.
  let state = AppState { store, dispatcher, scheduler };

  let app = lectern_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
