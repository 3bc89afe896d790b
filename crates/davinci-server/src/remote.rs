//! Fetching the community profile document at startup.

use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use davinci_core::profile::CommunityProfile;
use reqwest::Client;

const ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(500);

/// Fetch and parse the profile at `url`, retrying with exponential backoff.
pub async fn fetch_profile(url: &str) -> Result<CommunityProfile> {
  let client = Client::builder()
    .timeout(Duration::from_secs(10))
    .build()
    .context("failed to build HTTP client")?;

  let mut delay = BASE_DELAY;
  let mut attempt = 1;
  loop {
    match fetch_once(&client, url).await {
      Ok(profile) => return Ok(profile),
      Err(e) if attempt < ATTEMPTS => {
        tracing::debug!(url, attempt, error = %format!("{e:#}"), "profile fetch failed, retrying");
        tokio::time::sleep(delay).await;
        delay *= 2;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

async fn fetch_once(client: &Client, url: &str) -> Result<CommunityProfile> {
  let resp = client
    .get(url)
    .send()
    .await
    .with_context(|| format!("GET {url} failed"))?;
  if !resp.status().is_success() {
    return Err(anyhow!("GET {url} → {}", resp.status()));
  }
  let raw = resp.text().await.context("reading profile body")?;
  CommunityProfile::from_json(&raw).context("deserialising profile")
}

/// The profile at `url`, or [`CommunityProfile::fallback`] when there is no
/// URL or it cannot be fetched.
pub async fn load_profile(url: Option<&str>) -> CommunityProfile {
  let Some(url) = url else {
    return CommunityProfile::fallback();
  };
  match fetch_profile(url).await {
    Ok(profile) => {
      tracing::info!(url, name = %profile.community.name, "community profile loaded");
      profile
    }
    Err(e) => {
      tracing::warn!(url, error = %format!("{e:#}"), "using fallback community profile");
      CommunityProfile::fallback()
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::{Router, http::StatusCode, routing::get};
  use davinci_core::submission::Category;
  use tokio::net::TcpListener;

  use super::*;

  /// Serve `app` on an ephemeral port and return its base URL.
  async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
  }

  #[tokio::test]
  async fn loads_remote_document() {
    let base = serve(Router::new().route(
      "/config.json",
      get(|| async { r#"{"comunidade":{"nome":"Davinci"},"desafios":{"semanal":{"ativo":true}}}"# }),
    ))
    .await;

    let profile = fetch_profile(&format!("{base}/config.json")).await.unwrap();
    assert_eq!(profile.community.name, "Davinci");
    assert!(profile.accepts(Category::Weekly));
    assert!(!profile.accepts(Category::Daily));
  }

  #[tokio::test]
  async fn falls_back_when_unavailable() {
    let base = serve(Router::new().route(
      "/config.json",
      get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;

    let profile = load_profile(Some(&format!("{base}/config.json"))).await;
    assert_eq!(profile, CommunityProfile::fallback());
    assert_eq!(load_profile(None).await, CommunityProfile::fallback());
  }
}
