//! Submission types — a single piece of artwork entered by a community member.
//!
//! A submission is created pending, flipped to approved by a moderator, and
//! flagged eligible for voting only while it is a member of the active round.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, contact::Contact};

// ─── Skill tier ──────────────────────────────────────────────────────────────

/// The skill axis both submissions and voting categories are partitioned by.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SkillTier {
  Beginner,
  Intermediate,
  Advanced,
}

impl SkillTier {
  /// All tiers in ascending order.
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  /// The discriminant string stored in the database.
  pub fn as_str(&self) -> &'static str { self.into() }
}

impl FromStr for SkillTier {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::iter()
      .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| Error::UnknownTier(s.to_owned()))
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// The challenge bucket a submission targets.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
  /// Free-form entry outside any challenge; never voting-eligible.
  Free,
  Daily,
  Weekly,
  Monthly,
}

impl Category {
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  pub fn as_str(&self) -> &'static str { self.into() }

  /// Whether approved submissions in this category enter voting rounds.
  pub fn is_voting_eligible(&self) -> bool { !matches!(self, Self::Free) }
}

impl FromStr for Category {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::iter()
      .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| Error::UnknownCategory(s.to_owned()))
  }
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// A stored artwork submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
  pub id:                  Uuid,
  pub artist_name:         String,
  pub contact:             Contact,
  pub skill_tier:          SkillTier,
  pub category:            Category,
  /// Public URL returned by the object store.
  pub file_url:            String,
  pub approved:            bool,
  pub approved_at:         Option<DateTime<Utc>>,
  /// True only while the submission is a member of the active round.
  pub eligible_for_voting: bool,
  pub created_at:          DateTime<Utc>,
}

impl Submission {
  /// A fresh, unapproved submission.
  pub fn pending(
    artist_name: String,
    contact: Contact,
    skill_tier: SkillTier,
    category: Category,
    file_url: String,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      artist_name,
      contact,
      skill_tier,
      category,
      file_url,
      approved: false,
      approved_at: None,
      eligible_for_voting: false,
      created_at,
    }
  }

  /// Approved and in a category that takes part in voting.
  pub fn is_round_candidate(&self) -> bool {
    self.approved && self.category.is_voting_eligible()
  }
}

/// A submission as shown to the public: everything but the artist's contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSubmission {
  pub id:                  Uuid,
  pub artist_name:         String,
  pub skill_tier:          SkillTier,
  pub category:            Category,
  pub file_url:            String,
  pub approved:            bool,
  pub approved_at:         Option<DateTime<Utc>>,
  pub eligible_for_voting: bool,
  pub created_at:          DateTime<Utc>,
}

impl From<Submission> for PublicSubmission {
  fn from(s: Submission) -> Self {
    Self {
      id:                  s.id,
      artist_name:         s.artist_name,
      skill_tier:          s.skill_tier,
      category:            s.category,
      file_url:            s.file_url,
      approved:            s.approved,
      approved_at:         s.approved_at,
      eligible_for_voting: s.eligible_for_voting,
      created_at:          s.created_at,
    }
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Moderation state a listing is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
  #[default]
  Pending,
  Approved,
  Any,
}

/// Filter predicate for submission listings. The default matches everything
/// pending.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
  pub status:          ReviewStatus,
  /// Case-insensitive match on artist name.
  pub text:            Option<String>,
  /// Also match `text` as a substring of the contact. Never set for public
  /// listings.
  pub search_contacts: bool,
  pub tier:            Option<SkillTier>,
  pub category:        Option<Category>,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tier_parses_case_insensitively() {
    assert_eq!("Advanced".parse::<SkillTier>().unwrap(), SkillTier::Advanced);
    assert!("expert".parse::<SkillTier>().is_err());
  }

  #[test]
  fn free_category_is_not_voting_eligible() {
    assert!(!Category::Free.is_voting_eligible());
    assert!(Category::Monthly.is_voting_eligible());
  }

  #[test]
  fn public_view_drops_the_contact() {
    let s = Submission::pending(
      "Ana".into(),
      Contact::parse("+55 (11) 9999-0000").unwrap(),
      SkillTier::Beginner,
      Category::Weekly,
      "http://files/a.png".into(),
      Utc::now(),
    );
    let public = PublicSubmission::from(s.clone());
    assert_eq!(public.id, s.id);
    assert_eq!(public.artist_name, "Ana");

    let json = serde_json::to_value(&public).unwrap();
    assert!(json.get("contact").is_none());
  }
}
