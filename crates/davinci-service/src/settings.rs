//! Runtime settings — the switches an administrator can flip while the
//! service is running.

use std::collections::BTreeSet;

use chrono::TimeDelta;
use davinci_core::{profile::CommunityProfile, submission::Category};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default upload ceiling: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Longest accepted submission cooldown: one year.
pub const MAX_COOLDOWN_HOURS: u32 = 24 * 365;
/// Longest accepted voting round.
pub const MAX_ROUND_DURATION_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  pub submissions_open:    bool,
  pub voting_open:         bool,
  /// Challenge categories closed by an administrator regardless of the
  /// profile.
  pub closed_categories:   BTreeSet<Category>,
  pub max_upload_bytes:    usize,
  pub cooldown_hours:      u32,
  pub round_duration_days: u32,
  pub profile:             CommunityProfile,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      submissions_open:    true,
      voting_open:         true,
      closed_categories:   BTreeSet::new(),
      max_upload_bytes:    DEFAULT_MAX_UPLOAD_BYTES,
      cooldown_hours:      24,
      round_duration_days: 7,
      profile:             CommunityProfile::fallback(),
    }
  }
}

impl Settings {
  pub fn cooldown(&self) -> TimeDelta { TimeDelta::hours(self.cooldown_hours.into()) }

  pub fn round_duration(&self) -> TimeDelta {
    TimeDelta::days(self.round_duration_days.into())
  }

  /// Check values that may come from configuration rather than a patch.
  pub fn validate(&self) -> Result<()> {
    SettingsPatch {
      closed_categories: Some(self.closed_categories.clone()),
      max_upload_bytes: Some(self.max_upload_bytes),
      cooldown_hours: Some(self.cooldown_hours),
      round_duration_days: Some(self.round_duration_days),
      ..Default::default()
    }
    .validate()
  }

  /// Whether new submissions may target `category` right now.
  pub fn category_open(&self, category: Category) -> bool {
    self.profile.accepts(category) && !self.closed_categories.contains(&category)
  }

  pub fn open_categories(&self) -> Vec<Category> {
    Category::all().filter(|c| self.category_open(*c)).collect()
  }

  /// The public view of these settings.
  pub fn overview(&self) -> CommunityOverview {
    CommunityOverview {
      profile:          self.profile.clone(),
      submissions_open: self.submissions_open,
      voting_open:      self.voting_open,
      open_categories:  self.open_categories(),
      max_upload_bytes: self.max_upload_bytes,
    }
  }

  pub(crate) fn apply(&mut self, patch: SettingsPatch) -> Result<()> {
    patch.validate()?;
    let SettingsPatch {
      submissions_open,
      voting_open,
      closed_categories,
      max_upload_bytes,
      cooldown_hours,
      round_duration_days,
    } = patch;

    if let Some(v) = submissions_open {
      self.submissions_open = v;
    }
    if let Some(v) = voting_open {
      self.voting_open = v;
    }
    if let Some(v) = closed_categories {
      self.closed_categories = v;
    }
    if let Some(v) = max_upload_bytes {
      self.max_upload_bytes = v;
    }
    if let Some(v) = cooldown_hours {
      self.cooldown_hours = v;
    }
    if let Some(v) = round_duration_days {
      self.round_duration_days = v;
    }
    Ok(())
  }
}

/// A partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
  pub submissions_open:    Option<bool>,
  pub voting_open:         Option<bool>,
  pub closed_categories:   Option<BTreeSet<Category>>,
  pub max_upload_bytes:    Option<usize>,
  pub cooldown_hours:      Option<u32>,
  pub round_duration_days: Option<u32>,
}

impl SettingsPatch {
  fn validate(&self) -> Result<()> {
    if self.max_upload_bytes == Some(0) {
      return Err(Error::Validation("max_upload_bytes must be positive".into()));
    }
    if self.cooldown_hours.is_some_and(|h| h > MAX_COOLDOWN_HOURS) {
      return Err(Error::Validation(format!(
        "cooldown_hours must be at most {MAX_COOLDOWN_HOURS}"
      )));
    }
    if let Some(days) = self.round_duration_days
      && !(1..=MAX_ROUND_DURATION_DAYS).contains(&days)
    {
      return Err(Error::Validation(format!(
        "round_duration_days must be between 1 and {MAX_ROUND_DURATION_DAYS}"
      )));
    }
    if self
      .closed_categories
      .as_ref()
      .is_some_and(|c| c.contains(&Category::Free))
    {
      return Err(Error::Validation("the free category cannot be closed".into()));
    }
    Ok(())
  }
}

/// What `GET /api/community` returns.
#[derive(Debug, Clone, Serialize)]
pub struct CommunityOverview {
  pub profile:          CommunityProfile,
  pub submissions_open: bool,
  pub voting_open:      bool,
  pub open_categories:  Vec<Category>,
  pub max_upload_bytes: usize,
}
