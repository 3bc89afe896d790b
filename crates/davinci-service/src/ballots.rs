//! Ballot service: casting votes and reporting a voter's progress.

use std::collections::{BTreeMap, BTreeSet};

use davinci_core::{
  ballot::{Ballot, BallotInsert, VoterStatus},
  contact::Contact,
  object_store::ObjectStore,
  round::VotingRound,
  store::CommunityStore,
  submission::{SkillTier, Submission},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Community, Error, Result, retry};

/// One choice on a ballot sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
  pub skill_tier:    SkillTier,
  pub submission_id: Uuid,
}

/// Per-tier outcome of a ballot sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BallotOutcome {
  Accepted(Ballot),
  AlreadyVoted,
}

/// A validated voter identity.
struct Voter {
  name:    String,
  contact: Contact,
}

impl<S, O> Community<S, O>
where
  S: CommunityStore,
  O: ObjectStore,
{
  fn voter(&self, name: &str, contact: &str) -> Result<Voter> {
    if !self.settings().voting_open {
      return Err(Error::VotingClosed);
    }
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::Validation("voter name is required".into()));
    }
    Ok(Voter {
      name:    name.to_owned(),
      contact: Contact::parse(contact)?,
    })
  }

  /// The round, provided it is active and before its deadline.
  async fn open_round(&self, round_id: Uuid) -> Result<VotingRound> {
    let store = &self.store;
    let round = retry::read("get_round", move || store.get_round(round_id))
      .await
      .map_err(Error::store)?
      .ok_or(Error::RoundNotFound(round_id))?;
    if !round.is_open_at(self.clock.now()) {
      return Err(Error::RoundNotActive(round_id));
    }
    Ok(round)
  }

  async fn members(&self, round_id: Uuid) -> Result<Vec<Submission>> {
    let store = &self.store;
    retry::read("round_members", move || store.round_members(round_id))
      .await
      .map_err(Error::store)
  }

  async fn voted_tiers(&self, round_id: Uuid, contact: &Contact) -> Result<Vec<SkillTier>> {
    let store = &self.store;
    retry::read("voted_tiers", move || store.voted_tiers(round_id, contact))
      .await
      .map_err(Error::store)
  }

  /// Validate a pick against the round's members and record it. The
  /// storage uniqueness constraint has the final word on duplicates.
  async fn record_ballot(
    &self,
    round_id: Uuid,
    voter: &Voter,
    members: &[Submission],
    pick: Pick,
  ) -> Result<Ballot> {
    let submission = members
      .iter()
      .find(|s| s.id == pick.submission_id)
      .ok_or(Error::NotARoundMember {
        round_id,
        submission_id: pick.submission_id,
      })?;
    if submission.skill_tier != pick.skill_tier {
      return Err(Error::TierMismatch {
        claimed: pick.skill_tier,
        actual:  submission.skill_tier,
      });
    }
    if self
      .voted_tiers(round_id, &voter.contact)
      .await?
      .contains(&pick.skill_tier)
    {
      return Err(Error::AlreadyVoted(pick.skill_tier));
    }

    let ballot = Ballot {
      id: Uuid::new_v4(),
      round_id,
      submission_id: submission.id,
      voter_contact: voter.contact.clone(),
      voter_name: voter.name.clone(),
      skill_tier: submission.skill_tier,
      cast_at: self.clock.now(),
    };
    match self
      .store
      .insert_ballot(ballot.clone())
      .await
      .map_err(Error::store)?
    {
      BallotInsert::Inserted => {
        tracing::info!(%round_id, tier = %ballot.skill_tier, "ballot cast");
        Ok(ballot)
      }
      BallotInsert::Duplicate => {
        tracing::debug!(%round_id, tier = %ballot.skill_tier, "duplicate ballot rejected");
        Err(Error::AlreadyVoted(ballot.skill_tier))
      }
      BallotInsert::RoundClosed => Err(Error::RoundNotActive(round_id)),
      BallotInsert::RoundMissing => Err(Error::RoundNotFound(round_id)),
      BallotInsert::NotMember => Err(Error::NotARoundMember {
        round_id,
        submission_id: ballot.submission_id,
      }),
    }
  }

  /// Cast one vote for `submission_id` in `skill_tier` of an active round.
  pub async fn cast_ballot(
    &self,
    round_id: Uuid,
    voter_name: &str,
    voter_contact: &str,
    skill_tier: SkillTier,
    submission_id: Uuid,
  ) -> Result<Ballot> {
    let voter = self.voter(voter_name, voter_contact)?;
    self.open_round(round_id).await?;
    let members = self.members(round_id).await?;
    self
      .record_ballot(round_id, &voter, &members, Pick { skill_tier, submission_id })
      .await
  }

  /// Cast one vote per tier in a single request. Tiers the contact already
  /// voted in are reported rather than failing the sheet; any other error
  /// aborts it, leaving earlier picks recorded.
  pub async fn cast_ballots(
    &self,
    round_id: Uuid,
    voter_name: &str,
    voter_contact: &str,
    picks: &[Pick],
  ) -> Result<BTreeMap<SkillTier, BallotOutcome>> {
    let voter = self.voter(voter_name, voter_contact)?;
    if picks.is_empty() {
      return Err(Error::Validation("ballot sheet has no picks".into()));
    }
    let tiers: BTreeSet<_> = picks.iter().map(|p| p.skill_tier).collect();
    if tiers.len() != picks.len() {
      return Err(Error::Validation("ballot sheet has more than one pick per tier".into()));
    }

    self.open_round(round_id).await?;
    let members = self.members(round_id).await?;

    let mut outcomes = BTreeMap::new();
    for pick in picks {
      let outcome = match self.record_ballot(round_id, &voter, &members, *pick).await {
        Ok(ballot) => BallotOutcome::Accepted(ballot),
        Err(Error::AlreadyVoted(_)) => BallotOutcome::AlreadyVoted,
        Err(e) => return Err(e),
      };
      outcomes.insert(pick.skill_tier, outcome);
    }
    Ok(outcomes)
  }

  /// Per tier, whether `contact` has already voted in the round.
  pub async fn voter_status(&self, round_id: Uuid, contact: &str) -> Result<VoterStatus> {
    let contact = Contact::parse(contact)?;
    let store = &self.store;
    retry::read("get_round", move || store.get_round(round_id))
      .await
      .map_err(Error::store)?
      .ok_or(Error::RoundNotFound(round_id))?;
    let voted = self.voted_tiers(round_id, &contact).await?;
    Ok(VoterStatus::new(round_id, contact, &voted))
  }
}
