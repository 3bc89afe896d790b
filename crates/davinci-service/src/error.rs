//! Service error taxonomy.
//!
//! Business outcomes (closed categories, cooldowns, duplicate votes, …) and
//! infrastructure failures share one enum; [`Error::is_expected`] tells them
//! apart.

use chrono::TimeDelta;
use davinci_core::submission::{Category, SkillTier};
use thiserror::Error;
use uuid::Uuid;

/// Boxed error from a store or object-store backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("submissions are closed")]
  SubmissionsClosed,

  #[error("the {0} category is not accepting submissions")]
  CategoryClosed(Category),

  #[error("voting is closed")]
  VotingClosed,

  #[error("this contact submitted recently; try again in {}s", .remaining.num_seconds())]
  CooldownActive { remaining: TimeDelta },

  #[error("file upload failed")]
  UploadFailed(#[source] BoxError),

  #[error("failed to record the submission")]
  PersistFailed(#[source] BoxError),

  #[error("already voted in the {0} tier of this round")]
  AlreadyVoted(SkillTier),

  #[error(
    "a round needs at least {} approved challenge submissions, found {found}",
    crate::MIN_ROUND_MEMBERS
  )]
  InsufficientCandidates { found: usize },

  #[error("round not found: {0}")]
  RoundNotFound(Uuid),

  #[error("round {0} is not accepting ballots")]
  RoundNotActive(Uuid),

  #[error("submission not found: {0}")]
  SubmissionNotFound(Uuid),

  #[error("submission {submission_id} is not part of round {round_id}")]
  NotARoundMember { round_id: Uuid, submission_id: Uuid },

  #[error("submission is in the {actual} tier, not {claimed}")]
  TierMismatch { claimed: SkillTier, actual: SkillTier },

  #[error("round {round_id} left residue after teardown: {detail}")]
  InconsistentRoundState { round_id: Uuid, detail: String },

  #[error("unauthorized")]
  Unauthorized,

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// Whether this is an ordinary business outcome rather than an
  /// infrastructure failure.
  pub fn is_expected(&self) -> bool {
    !matches!(
      self,
      Self::UploadFailed(_)
        | Self::PersistFailed(_)
        | Self::InconsistentRoundState { .. }
        | Self::Store(_)
    )
  }
}

impl From<davinci_core::Error> for Error {
  fn from(e: davinci_core::Error) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
