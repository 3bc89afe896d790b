//! The `CommunityStore` trait — the Record Store behind every service.
//!
//! The trait is implemented by storage backends (e.g. `davinci-store-sqlite`).
//! Services depend on this abstraction, not on any concrete backend.
//!
//! Constraints that must hold under concurrent clients are pushed into the
//! backend: ballot uniqueness, the submission cooldown guard, and the
//! all-or-nothing round creation and teardown. Their outcomes are reported as
//! values ([`BallotInsert`], [`SubmissionInsert`], [`RoundCreation`]) rather
//! than errors so callers can tell a business outcome from a failure.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  ballot::{Ballot, BallotInsert},
  contact::Contact,
  round::{ConsistencyReport, RoundCreation, TeardownReport, VotingRound},
  submission::{SkillTier, Submission, SubmissionFilter},
};

/// Classifies store errors that may succeed when retried unchanged.
pub trait Transient {
  fn is_transient(&self) -> bool;
}

impl Transient for std::convert::Infallible {
  fn is_transient(&self) -> bool { match *self {} }
}

/// Result of a cooldown-guarded submission insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionInsert {
  Inserted,
  /// The contact already has a submission newer than the guard instant.
  CoolingDown { last: DateTime<Utc> },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Davinci record store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CommunityStore: Send + Sync {
  type Error: std::error::Error + Transient + Send + Sync + 'static;

  // ── Submissions ───────────────────────────────────────────────────────

  /// Insert `submission` unless its contact already has a submission created
  /// after `not_since`. The check and the insert are one atomic step.
  fn insert_submission(
    &self,
    submission: Submission,
    not_since: DateTime<Utc>,
  ) -> impl Future<Output = Result<SubmissionInsert, Self::Error>> + Send + '_;

  /// Retrieve a submission by id. Returns `None` if not found.
  fn get_submission(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// Creation time of the newest submission from `contact`, if any.
  fn last_submission_at<'a>(
    &'a self,
    contact: &'a Contact,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + 'a;

  /// Submissions matching `filter`, newest first.
  fn list_submissions<'a>(
    &'a self,
    filter: &'a SubmissionFilter,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + 'a;

  /// Mark a submission approved. Already-approved submissions keep their
  /// original `approved_at`. Returns `None` if not found.
  fn approve_submission(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// Permanently delete a submission, its memberships and the ballots cast
  /// for it. Returns the deleted record, or `None` if not found.
  fn delete_submission(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  // ── Rounds ────────────────────────────────────────────────────────────

  /// Atomically deactivate any active round, insert `round` as the active
  /// one and snapshot every candidate that is still an approved, non-free
  /// submission. Nothing changes when fewer than `min_members` remain.
  fn create_round(
    &self,
    round: VotingRound,
    candidates: Vec<Uuid>,
    min_members: usize,
  ) -> impl Future<Output = Result<RoundCreation, Self::Error>> + Send + '_;

  fn get_round(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<VotingRound>, Self::Error>> + Send + '_;

  /// The single active round, if any.
  fn active_round(
    &self,
  ) -> impl Future<Output = Result<Option<VotingRound>, Self::Error>> + Send + '_;

  /// All rounds, newest first.
  fn list_rounds(
    &self,
  ) -> impl Future<Output = Result<Vec<VotingRound>, Self::Error>> + Send + '_;

  /// Member submissions of a round, oldest first.
  fn round_members(
    &self,
    round_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + '_;

  /// Deactivate a round and clear its members' eligibility; ballots are
  /// kept. Returns the updated round, or `None` if not found.
  fn close_round(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<VotingRound>, Self::Error>> + Send + '_;

  /// Delete a round's ballots, clear its members' eligibility, delete its
  /// memberships and finally the round, as one atomic step. Safe to repeat.
  fn teardown_round(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<TeardownReport, Self::Error>> + Send + '_;

  // ── Ballots ───────────────────────────────────────────────────────────

  /// Insert a ballot, only while its round is active and `cast_at` is before
  /// the deadline. A second ballot for the same round, contact and tier
  /// yields [`BallotInsert::Duplicate`].
  fn insert_ballot(
    &self,
    ballot: Ballot,
  ) -> impl Future<Output = Result<BallotInsert, Self::Error>> + Send + '_;

  /// Tiers in which `contact` already has a ballot for `round_id`.
  fn voted_tiers<'a>(
    &'a self,
    round_id: Uuid,
    contact: &'a Contact,
  ) -> impl Future<Output = Result<Vec<SkillTier>, Self::Error>> + Send + 'a;

  /// All ballots of a round, in casting order.
  fn list_ballots(
    &self,
    round_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Ballot>, Self::Error>> + Send + '_;

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Detect divergences between memberships, eligibility flags and ballots.
  fn consistency_report(
    &self,
  ) -> impl Future<Output = Result<ConsistencyReport, Self::Error>> + Send + '_;

  /// Fix every divergence [`CommunityStore::consistency_report`] would list
  /// and return what was repaired.
  fn repair_consistency(
    &self,
  ) -> impl Future<Output = Result<ConsistencyReport, Self::Error>> + Send + '_;
}
