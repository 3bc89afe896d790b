//! JSON REST API for Davinci.
//!
//! Exposes an axum [`Router`] over a [`Community`]. TLS, static file serving
//! and process concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", davinci_api::api_router(state))
//! ```

pub mod admin;
pub mod auth;
pub mod error;
pub mod public;
pub mod voting;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use davinci_core::{object_store::ObjectStore, store::CommunityStore};
use davinci_service::{AdminGate, Community};

pub use auth::Authenticated;
pub use error::ApiError;

/// Room for JSON framing around a base64-encoded upload.
const BODY_OVERHEAD: usize = 64 * 1024;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, O> {
  pub community: Arc<Community<S, O>>,
  pub gate:      Arc<AdminGate>,
}

impl<S, O> Clone for AppState<S, O> {
  fn clone(&self) -> Self {
    Self {
      community: self.community.clone(),
      gate:      self.gate.clone(),
    }
  }
}

impl<S, O> AppState<S, O> {
  pub fn new(community: Community<S, O>, gate: AdminGate) -> Self {
    Self {
      community: Arc::new(community),
      gate:      Arc::new(gate),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type. The request body limit is sized from the upload
/// ceiling in effect when the router is built.
pub fn api_router<S, O>(state: AppState<S, O>) -> Router<()>
where
  S: CommunityStore + 'static,
  O: ObjectStore + 'static,
{
  let upload = state.community.settings().max_upload_bytes;
  let body_limit = upload.div_ceil(3) * 4 + BODY_OVERHEAD;

  Router::new()
    // Public
    .route("/community", get(public::community::<S, O>))
    .route("/submissions", post(public::submit::<S, O>))
    .route("/gallery", get(public::gallery::<S, O>))
    // Voting
    .route("/rounds/active", get(voting::active_round::<S, O>))
    .route("/rounds/{id}/results", get(voting::results::<S, O>))
    .route("/rounds/{id}/voters/status", get(voting::voter_status::<S, O>))
    .route("/rounds/{id}/ballots", post(voting::cast_ballot::<S, O>))
    .route("/rounds/{id}/ballot-sheet", post(voting::cast_ballot_sheet::<S, O>))
    // Moderation
    .route("/admin/submissions", get(admin::list_submissions::<S, O>))
    .route("/admin/submissions/{id}/approve", post(admin::approve::<S, O>))
    .route("/admin/submissions/{id}", axum::routing::delete(admin::reject::<S, O>))
    .route("/admin/stats", get(admin::stats::<S, O>))
    // Rounds
    .route("/admin/rounds", get(admin::list_rounds::<S, O>).post(admin::create_round::<S, O>))
    .route("/admin/rounds/{id}/close", post(admin::close_round::<S, O>))
    .route("/admin/rounds/{id}", axum::routing::delete(admin::teardown_round::<S, O>))
    .route("/admin/consistency", get(admin::consistency::<S, O>))
    .route("/admin/consistency/repair", post(admin::repair::<S, O>))
    // Settings
    .route("/admin/settings", get(admin::settings::<S, O>).patch(admin::update_settings::<S, O>))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}

#[cfg(test)]
mod tests;
