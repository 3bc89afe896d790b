//! Result aggregator: read-time tallies of a round's ballots.

use std::collections::{BTreeMap, HashSet};

use davinci_core::{
  ballot::Ballot,
  object_store::ObjectStore,
  round::VotingRound,
  store::CommunityStore,
  submission::{PublicSubmission, SkillTier, Submission},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Community, Error, Result, retry, rounds::count_votes};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
  pub submission: PublicSubmission,
  pub vote_count: u64,
  /// 1-based; entries with equal counts share a rank.
  pub rank:       usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundResults {
  pub round:             VotingRound,
  /// Every tier is present; tiers without votes map to an empty list.
  pub per_tier:          BTreeMap<SkillTier, Vec<RankedEntry>>,
  pub total_votes:       u64,
  pub distinct_voters:   usize,
  pub participant_count: usize,
}

/// Rank `members` by their ballots, per tier.
///
/// Most votes first; ties go to the earlier submission, then the lower id.
/// Members without votes are left out.
pub(crate) fn rank(
  members: &[Submission],
  ballots: &[Ballot],
) -> BTreeMap<SkillTier, Vec<RankedEntry>> {
  let counts = count_votes(ballots);
  let mut per_tier: BTreeMap<_, _> = SkillTier::all().map(|t| (t, Vec::new())).collect();

  for tier in SkillTier::all() {
    let mut voted: Vec<(&Submission, u64)> = members
      .iter()
      .filter(|s| s.skill_tier == tier)
      .filter_map(|s| counts.get(&s.id).map(|c| (s, *c)))
      .collect();
    voted.sort_by(|(a, ac), (b, bc)| {
      bc.cmp(ac)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
    });

    let entries = per_tier.entry(tier).or_default();
    let mut previous: Option<(u64, usize)> = None;
    for (i, (submission, vote_count)) in voted.into_iter().enumerate() {
      let rank = match previous {
        Some((count, rank)) if count == vote_count => rank,
        _ => i + 1,
      };
      previous = Some((vote_count, rank));
      entries.push(RankedEntry {
        submission: submission.clone().into(),
        vote_count,
        rank,
      });
    }
  }
  per_tier
}

impl<S, O> Community<S, O>
where
  S: CommunityStore,
  O: ObjectStore,
{
  /// Tally a round. Works for active, closed and empty rounds alike.
  pub async fn tally(&self, round_id: Uuid) -> Result<RoundResults> {
    let store = &self.store;
    let round = retry::read("get_round", move || store.get_round(round_id))
      .await
      .map_err(Error::store)?
      .ok_or(Error::RoundNotFound(round_id))?;
    let members = retry::read("round_members", move || store.round_members(round_id))
      .await
      .map_err(Error::store)?;
    let ballots = retry::read("list_ballots", move || store.list_ballots(round_id))
      .await
      .map_err(Error::store)?;

    let distinct_voters = ballots
      .iter()
      .map(|b| &b.voter_contact)
      .collect::<HashSet<_>>()
      .len();

    Ok(RoundResults {
      per_tier: rank(&members, &ballots),
      total_votes: ballots.len() as u64,
      distinct_voters,
      participant_count: members.len(),
      round,
    })
  }
}
