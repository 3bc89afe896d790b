//! Voting round manager.
//!
//! A round is created from every approved challenge submission, stays active
//! until it is closed, replaced or torn down, and is the only place ballots
//! can be cast.

use std::collections::HashMap;

use davinci_core::{
  ballot::Ballot,
  object_store::ObjectStore,
  round::{ActiveRoundView, ConsistencyReport, MemberEntry, RoundCreation, TeardownReport, VotingRound},
  store::CommunityStore,
  submission::{ReviewStatus, SubmissionFilter},
};
use uuid::Uuid;

use crate::{Admin, Community, Error, Result, retry};

/// Fewest candidates a round can be created with.
pub const MIN_ROUND_MEMBERS: usize = 2;

/// Ballot count per submission id.
pub(crate) fn count_votes(ballots: &[Ballot]) -> HashMap<Uuid, u64> {
  let mut counts = HashMap::new();
  for b in ballots {
    *counts.entry(b.submission_id).or_insert(0) += 1;
  }
  counts
}

impl<S, O> Community<S, O>
where
  S: CommunityStore,
  O: ObjectStore,
{
  /// Start a new round from every approved, non-free submission. Any active
  /// round is deactivated in the same transaction.
  pub async fn create_round(&self, _admin: &Admin, title: &str) -> Result<VotingRound> {
    let now = self.clock.now();
    let title = match title.trim() {
      "" => format!("Voting round {}", now.format("%Y-%m-%d")),
      t => t.to_owned(),
    };
    let closes_at = now
      .checked_add_signed(self.settings().round_duration())
      .ok_or_else(|| Error::Validation("round duration is out of range".into()))?;

    let approved = self
      .store
      .list_submissions(&SubmissionFilter {
        status: ReviewStatus::Approved,
        ..Default::default()
      })
      .await
      .map_err(Error::store)?;
    let candidates: Vec<Uuid> = approved
      .iter()
      .filter(|s| s.is_round_candidate())
      .map(|s| s.id)
      .collect();
    if candidates.len() < MIN_ROUND_MEMBERS {
      return Err(Error::InsufficientCandidates { found: candidates.len() });
    }

    let round = VotingRound {
      id: Uuid::new_v4(),
      title,
      active: true,
      created_at: now,
      closes_at,
      closed_at: None,
    };

    match self
      .store
      .create_round(round.clone(), candidates, MIN_ROUND_MEMBERS)
      .await
      .map_err(Error::store)?
    {
      RoundCreation::Created { members } => {
        tracing::info!(id = %round.id, title = %round.title, members, "voting round created");
        Ok(round)
      }
      RoundCreation::InsufficientCandidates { found } => {
        Err(Error::InsufficientCandidates { found })
      }
    }
  }

  /// The active round with its members and their live vote counts.
  pub async fn active_round(&self) -> Result<Option<ActiveRoundView>> {
    let store = &self.store;
    let Some(round) = retry::read("active_round", move || store.active_round())
      .await
      .map_err(Error::store)?
    else {
      return Ok(None);
    };

    let round_id = round.id;
    let members = retry::read("round_members", move || store.round_members(round_id))
      .await
      .map_err(Error::store)?;
    let ballots = retry::read("list_ballots", move || store.list_ballots(round_id))
      .await
      .map_err(Error::store)?;

    let counts = count_votes(&ballots);
    let members = members
      .into_iter()
      .map(|submission| MemberEntry {
        votes:      counts.get(&submission.id).copied().unwrap_or(0),
        submission: submission.into(),
      })
      .collect();
    Ok(Some(ActiveRoundView { round, members }))
  }

  /// Deactivate a round and clear its members' eligibility, keeping the
  /// ballots so results stay available.
  pub async fn close_round(&self, _admin: &Admin, id: Uuid) -> Result<VotingRound> {
    let round = self
      .store
      .close_round(id, self.clock.now())
      .await
      .map_err(Error::store)?
      .ok_or(Error::RoundNotFound(id))?;
    tracing::info!(%id, "voting round closed");
    Ok(round)
  }

  /// Delete a round with all of its ballots and memberships. Tearing down a
  /// round that no longer exists is a no-op.
  pub async fn teardown_round(&self, _admin: &Admin, id: Uuid) -> Result<TeardownReport> {
    let round = self.store.get_round(id).await.map_err(Error::store)?;
    // Members of an inactive round may legitimately be flagged by a newer
    // round, so flags are only checked for the active one.
    let flagged_members = match &round {
      Some(r) if r.active => self.store.round_members(id).await.map_err(Error::store)?,
      _ => Vec::new(),
    };

    let report = self.store.teardown_round(id).await.map_err(Error::store)?;

    let leftover_ballots = self.store.list_ballots(id).await.map_err(Error::store)?.len();
    let round_remains = self.store.get_round(id).await.map_err(Error::store)?.is_some();
    let mut still_flagged = 0;
    for member in &flagged_members {
      let current = self.store.get_submission(member.id).await.map_err(Error::store)?;
      if current.is_some_and(|s| s.eligible_for_voting) {
        still_flagged += 1;
      }
    }

    if leftover_ballots > 0 || round_remains || still_flagged > 0 {
      tracing::error!(
        %id,
        leftover_ballots,
        round_remains,
        still_flagged,
        "round teardown left residue"
      );
      return Err(Error::InconsistentRoundState {
        round_id: id,
        detail:   format!(
          "{leftover_ballots} ballots, {still_flagged} flagged submissions, round present: \
           {round_remains}"
        ),
      });
    }

    if report.is_noop() {
      tracing::debug!(%id, "teardown of missing round");
    } else {
      tracing::info!(
        %id,
        ballots = report.ballots_deleted,
        members = report.members_detached,
        "voting round torn down"
      );
    }
    Ok(report)
  }

  /// Every round, newest first.
  pub async fn list_rounds(&self, _admin: &Admin) -> Result<Vec<VotingRound>> {
    let store = &self.store;
    retry::read("list_rounds", move || store.list_rounds())
      .await
      .map_err(Error::store)
  }

  pub async fn check_consistency(&self, _admin: &Admin) -> Result<ConsistencyReport> {
    let store = &self.store;
    retry::read("consistency_report", move || store.consistency_report())
      .await
      .map_err(Error::store)
  }

  /// Fix every divergence [`Self::check_consistency`] reports and return
  /// what was found.
  pub async fn repair_consistency(&self, _admin: &Admin) -> Result<ConsistencyReport> {
    self.store.repair_consistency().await.map_err(Error::store)
  }
}
