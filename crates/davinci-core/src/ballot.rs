//! Ballots — one vote cast by a contact for one submission within one skill
//! tier of one round.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{contact::Contact, submission::SkillTier};

/// An immutable vote. At most one ballot exists per
/// `(round_id, voter_contact, skill_tier)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
  pub id:            Uuid,
  pub round_id:      Uuid,
  pub submission_id: Uuid,
  pub voter_contact: Contact,
  pub voter_name:    String,
  /// Copied from the submission at vote time.
  pub skill_tier:    SkillTier,
  pub cast_at:       DateTime<Utc>,
}

/// Result of inserting a ballot under the uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotInsert {
  Inserted,
  /// A ballot for the same round, contact and tier already exists.
  Duplicate,
  /// The round exists but is inactive or past its deadline.
  RoundClosed,
  /// The round does not exist.
  RoundMissing,
  /// The submission is not a member of the round.
  NotMember,
}

/// Per-tier record of whether a contact has already voted in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
  pub round_id: Uuid,
  pub contact:  Contact,
  pub voted:    BTreeMap<SkillTier, bool>,
}

impl VoterStatus {
  pub fn new(round_id: Uuid, contact: Contact, voted_tiers: &[SkillTier]) -> Self {
    let voted = SkillTier::all()
      .map(|t| (t, voted_tiers.contains(&t)))
      .collect();
    Self { round_id, contact, voted }
  }

  pub fn has_voted(&self, tier: SkillTier) -> bool {
    self.voted.get(&tier).copied().unwrap_or(false)
  }

  /// True once the contact has voted in every tier.
  pub fn is_complete(&self) -> bool { self.voted.values().all(|v| *v) }
}
