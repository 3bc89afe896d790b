//! Davinci server: configuration, object storage and the HTTP router.

pub mod objects;
pub mod remote;

use std::path::{Path, PathBuf};

use axum::Router;
use davinci_api::AppState;
use davinci_core::{
  object_store::ObjectStore, profile::CommunityProfile, store::CommunityStore,
};
use davinci_service::{Settings, settings::DEFAULT_MAX_UPLOAD_BYTES};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use objects::FsObjectStore;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_max_upload_bytes() -> usize { DEFAULT_MAX_UPLOAD_BYTES }
fn default_cooldown_hours() -> u32 { 24 }
fn default_round_duration_days() -> u32 { 7 }
fn default_true() -> bool { true }

/// Runtime server configuration, deserialised from `config.toml` and
/// `DAVINCI_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  /// Public origin, e.g. `https://davinci.example`; file URLs are built
  /// from it.
  pub base_url:            String,
  pub store_path:          PathBuf,
  pub upload_dir:          PathBuf,
  /// argon2 PHC string for the administrative secret.
  pub admin_secret_hash:   String,
  /// Where the community profile document lives. Without it every
  /// challenge category is open.
  #[serde(default)]
  pub profile_url:         Option<String>,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes:    usize,
  #[serde(default = "default_cooldown_hours")]
  pub cooldown_hours:      u32,
  #[serde(default = "default_round_duration_days")]
  pub round_duration_days: u32,
  #[serde(default = "default_true")]
  pub submissions_open:    bool,
  #[serde(default = "default_true")]
  pub voting_open:         bool,
}

impl ServerConfig {
  /// Initial runtime settings for this configuration.
  pub fn settings(&self, profile: CommunityProfile) -> davinci_service::Result<Settings> {
    let settings = Settings {
      submissions_open: self.submissions_open,
      voting_open: self.voting_open,
      max_upload_bytes: self.max_upload_bytes,
      cooldown_hours: self.cooldown_hours,
      round_duration_days: self.round_duration_days,
      profile,
      ..Default::default()
    };
    settings.validate()?;
    Ok(settings)
  }

  /// URL prefix uploaded files are served under.
  pub fn files_base(&self) -> String {
    format!("{}/files", self.base_url.trim_end_matches('/'))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api` and uploaded files under
/// `/files`.
pub fn router<S, O>(state: AppState<S, O>, upload_dir: &Path) -> Router
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  Router::new()
    .nest("/api", davinci_api::api_router(state))
    .nest_service("/files", ServeDir::new(upload_dir))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use bytes::Bytes;
  use davinci_service::{AdminGate, Community, hash_secret};
  use davinci_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn minimal_config_uses_defaults() {
    let cfg = parse(
      r#"
        base_url = "https://davinci.example/"
        store_path = "~/davinci/db.sqlite"
        upload_dir = "/var/lib/davinci/files"
        admin_secret_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
      "#,
    );
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
    assert!(cfg.profile_url.is_none());
    assert_eq!(cfg.files_base(), "https://davinci.example/files");

    let settings = cfg.settings(CommunityProfile::fallback()).unwrap();
    assert_eq!(settings.cooldown_hours, 24);
    assert!(settings.submissions_open && settings.voting_open);
  }

  #[test]
  fn out_of_range_durations_are_rejected() {
    let cfg = parse(
      r#"
        base_url = "https://davinci.example/"
        store_path = "db.sqlite"
        upload_dir = "files"
        admin_secret_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
        cooldown_hours = 4294967295
        round_duration_days = 4294967295
      "#,
    );
    assert!(cfg.settings(CommunityProfile::fallback()).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }

  #[tokio::test]
  async fn uploaded_files_are_served() {
    let dir = std::env::temp_dir().join(format!("davinci-files-{}", uuid::Uuid::new_v4()));
    let objects = FsObjectStore::open(&dir, "http://localhost/files").await.unwrap();
    let url = objects
      .put(Bytes::from_static(b"GIF89a-data"), "image/gif")
      .await
      .unwrap();
    let path = url.strip_prefix("http://localhost").unwrap().to_owned();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let community = Community::new(store, objects, Settings::default());
    let gate = AdminGate::new(hash_secret("s").unwrap()).unwrap();
    let app = router(AppState::new(community, gate), &dir);

    let resp = app
      .clone()
      .oneshot(Request::builder().uri(&path).body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), b"GIF89a-data");

    let resp = app
      .oneshot(Request::builder().uri("/api/community").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
