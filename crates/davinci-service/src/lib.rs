//! Davinci business services.
//!
//! [`Community`] bundles the submission, moderation, voting-round, ballot and
//! result services over any [`CommunityStore`] and [`ObjectStore`]. Methods
//! that change moderation or round state take an [`Admin`] capability, which
//! only [`AdminGate::verify`] can produce.

mod ballots;
mod moderation;
mod results;
mod retry;
mod rounds;
mod submission;

pub mod error;
pub mod gate;
pub mod settings;

use std::sync::{Arc, PoisonError, RwLock};

use davinci_core::{
  clock::{Clock, SystemClock},
  object_store::ObjectStore,
  store::CommunityStore,
};

pub use ballots::{BallotOutcome, Pick};
pub use error::{Error, Result};
pub use gate::{Admin, AdminGate, hash_secret};
pub use moderation::SubmissionStats;
pub use results::{RankedEntry, RoundResults};
pub use rounds::MIN_ROUND_MEMBERS;
pub use settings::{CommunityOverview, Settings, SettingsPatch};
pub use submission::{MAX_ARTIST_NAME_CHARS, SubmissionRequest, sniff_image};

/// The Davinci service layer.
pub struct Community<S, O> {
  store:    S,
  objects:  O,
  clock:    Arc<dyn Clock>,
  settings: RwLock<Settings>,
}

impl<S, O> Community<S, O>
where
  S: CommunityStore,
  O: ObjectStore,
{
  pub fn new(store: S, objects: O, settings: Settings) -> Self {
    Self::with_clock(store, objects, settings, Arc::new(SystemClock))
  }

  pub fn with_clock(store: S, objects: O, settings: Settings, clock: Arc<dyn Clock>) -> Self {
    Self {
      store,
      objects,
      clock,
      settings: RwLock::new(settings),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn objects(&self) -> &O { &self.objects }

  // ─── Settings ──────────────────────────────────────────────────────────────

  /// A snapshot of the current settings.
  pub fn settings(&self) -> Settings {
    self
      .settings
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn overview(&self) -> CommunityOverview { self.settings().overview() }

  /// Apply `patch` and return the resulting settings.
  pub fn update_settings(&self, _admin: &Admin, patch: SettingsPatch) -> Result<Settings> {
    let mut settings = self
      .settings
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    settings.apply(patch)?;
    tracing::info!(
      submissions_open = settings.submissions_open,
      voting_open = settings.voting_open,
      "settings updated"
    );
    Ok(settings.clone())
  }

  // ─── Helpers ───────────────────────────────────────────────────────────────

  /// Delete an uploaded file, logging instead of failing.
  async fn discard_file(&self, url: &str) {
    match self.objects.delete(url).await {
      Ok(true) => {}
      Ok(false) => tracing::warn!(url, "file to discard was already gone"),
      Err(e) => tracing::warn!(url, error = %e, "failed to delete file; it is now orphaned"),
    }
  }
}
