//! The community profile — a static JSON document fetched once at startup.
//!
//! Only the challenge definitions matter to the services (they decide which
//! categories accept submissions); everything else is passed through to
//! clients untouched. Keys from the original Portuguese document
//! (`comunidade`, `desafios`, `ativo`, …) are accepted as aliases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Result, submission::Category};

// ─── Community ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityInfo {
  #[serde(default, alias = "nome")]
  pub name:         String,
  #[serde(default, alias = "descricao")]
  pub description:  String,
  /// Platform name → URL.
  #[serde(default, alias = "redesSociais")]
  pub social_links: BTreeMap<String, String>,
  /// Anything else the document carries (founder, events, group invites).
  #[serde(flatten)]
  pub extra:        serde_json::Map<String, serde_json::Value>,
}

// ─── Challenges ──────────────────────────────────────────────────────────────

/// One challenge definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
  #[serde(default, alias = "tema")]
  pub theme:       String,
  #[serde(default, alias = "descricao")]
  pub description: String,
  #[serde(default, alias = "premio")]
  pub prize:       String,
  #[serde(default, alias = "ativo")]
  pub active:      bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Challenges {
  #[serde(default, alias = "diario")]
  pub daily:   Option<Challenge>,
  #[serde(default, alias = "semanal")]
  pub weekly:  Option<Challenge>,
  #[serde(default, alias = "mensal")]
  pub monthly: Option<Challenge>,
}

impl Challenges {
  pub fn get(&self, category: Category) -> Option<&Challenge> {
    match category {
      Category::Free => None,
      Category::Daily => self.daily.as_ref(),
      Category::Weekly => self.weekly.as_ref(),
      Category::Monthly => self.monthly.as_ref(),
    }
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// A featured video entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedVideo {
  #[serde(default, alias = "titulo")]
  pub title: String,
  pub url:   String,
}

/// The whole remote document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityProfile {
  #[serde(default, alias = "comunidade")]
  pub community:  CommunityInfo,
  #[serde(default, alias = "desafios")]
  pub challenges: Challenges,
  #[serde(default, alias = "videos")]
  pub featured_videos: Vec<FeaturedVideo>,
}

impl CommunityProfile {
  pub fn from_json(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }

  /// Profile used when the remote document cannot be fetched: every
  /// challenge category is open, with no theme.
  pub fn fallback() -> Self {
    let open = || {
      Some(Challenge {
        active: true,
        ..Default::default()
      })
    };
    Self {
      challenges: Challenges {
        daily:   open(),
        weekly:  open(),
        monthly: open(),
      },
      ..Default::default()
    }
  }

  /// Whether the profile lets submissions target `category`. Free entries
  /// are always accepted; challenge categories need an active definition.
  pub fn accepts(&self, category: Category) -> bool {
    match category {
      Category::Free => true,
      other => self.challenges.get(other).is_some_and(|c| c.active),
    }
  }
}
