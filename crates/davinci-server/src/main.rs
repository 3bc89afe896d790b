//! davinci-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `DAVINCI_*`
//! environment variables, opens the SQLite store, fetches the community
//! profile and serves the JSON API and uploaded files over HTTP.
//!
//! # Admin secret hash
//!
//! To generate the argon2 PHC string for `admin_secret_hash`:
//!
//! ```text
//! cargo run -p davinci-server -- --hash-secret
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use davinci_api::AppState;
use davinci_core::{profile::CommunityProfile, store::CommunityStore as _};
use davinci_server::{FsObjectStore, ServerConfig, expand_tilde, remote};
use davinci_service::{AdminGate, Community, hash_secret};
use davinci_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Davinci submission and voting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a secret entered on stdin and exit.
  #[arg(long)]
  hash_secret: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_secret {
    let secret = read_secret()?;
    let hash = hash_secret(&secret).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DAVINCI"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let initial_settings = |profile| {
    server_cfg
      .settings(profile)
      .context("invalid runtime settings in configuration")
  };
  // Reject bad durations before touching the store.
  initial_settings(CommunityProfile::fallback())?;

  let gate = AdminGate::new(server_cfg.admin_secret_hash.as_str())
    .map_err(|e| anyhow::anyhow!("admin_secret_hash is not a valid PHC string: {e}"))?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let report = store
    .consistency_report()
    .await
    .context("failed to check round consistency")?;
  if !report.is_clean() {
    tracing::warn!(?report, "round state is inconsistent; repair it from the admin API");
  }

  // Object storage.
  let upload_dir = expand_tilde(&server_cfg.upload_dir);
  let objects = FsObjectStore::open(&upload_dir, &server_cfg.files_base())
    .await
    .with_context(|| format!("failed to open upload directory {upload_dir:?}"))?;

  let profile = remote::load_profile(server_cfg.profile_url.as_deref()).await;
  let community = Community::new(store, objects, initial_settings(profile)?);

  let app = davinci_server::router(AppState::new(community, gate), &upload_dir);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read the secret from one line of stdin.
fn read_secret() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Secret: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let secret = line.trim_end_matches(['\n', '\r']).to_string();
  anyhow::ensure!(!secret.is_empty(), "secret must not be empty");
  Ok(secret)
}
