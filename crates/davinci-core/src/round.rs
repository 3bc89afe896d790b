//! Voting rounds — snapshot-based voting events binding a fixed set of
//! eligible submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::submission::PublicSubmission;

// ─── Round ───────────────────────────────────────────────────────────────────

/// A voting round. At most one round is active at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingRound {
  pub id:         Uuid,
  pub title:      String,
  pub active:     bool,
  pub created_at: DateTime<Utc>,
  /// Ballots are refused after this instant even if the round is still
  /// active.
  pub closes_at:  DateTime<Utc>,
  pub closed_at:  Option<DateTime<Utc>>,
}

impl VotingRound {
  /// Whether the round accepts ballots at `now`.
  pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
    self.active && now < self.closes_at
  }
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// A member submission with its live vote count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntry {
  pub submission: PublicSubmission,
  pub votes:      u64,
}

/// The active round joined with its members — computed on read, never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRoundView {
  pub round:   VotingRound,
  pub members: Vec<MemberEntry>,
}

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Result of an atomic round creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundCreation {
  Created { members: usize },
  /// Fewer candidates than required were still approved at commit time; no
  /// change was made.
  InsufficientCandidates { found: usize },
}

/// What a teardown removed. All zero when the round was already gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
  pub round_found:       bool,
  pub ballots_deleted:   usize,
  pub members_detached:  usize,
  pub flags_cleared:     usize,
}

impl TeardownReport {
  pub fn is_noop(&self) -> bool {
    !self.round_found
      && self.ballots_deleted == 0
      && self.members_detached == 0
      && self.flags_cleared == 0
  }
}

/// Divergences between round membership, eligibility flags and ballots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
  /// Flagged eligible but not a member of the active round.
  pub stale_eligible:   Vec<Uuid>,
  /// Members of the active round whose flag is not set.
  pub missing_eligible: Vec<Uuid>,
  /// Ballots with no matching round membership.
  pub orphan_ballots:   Vec<Uuid>,
  /// Every round currently marked active; more than one is a violation.
  pub active_rounds:    Vec<Uuid>,
}

impl ConsistencyReport {
  pub fn is_clean(&self) -> bool {
    self.stale_eligible.is_empty()
      && self.missing_eligible.is_empty()
      && self.orphan_ballots.is_empty()
      && self.active_rounds.len() <= 1
  }
}
