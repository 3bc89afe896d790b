//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, TimeZone as _, Utc};
use davinci_core::{
  ballot::{Ballot, BallotInsert},
  contact::Contact,
  round::{RoundCreation, VotingRound},
  store::{CommunityStore, SubmissionInsert},
  submission::{Category, ReviewStatus, SkillTier, Submission, SubmissionFilter},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() }

fn contact(s: &str) -> Contact { Contact::parse(s).unwrap() }

fn submission(name: &str, who: &str, tier: SkillTier, category: Category, at: DateTime<Utc>) -> Submission {
  Submission::pending(
    name.into(),
    contact(who),
    tier,
    category,
    format!("memory://{name}"),
    at,
  )
}

/// Insert a submission and approve it.
async fn approved(
  s: &SqliteStore,
  name: &str,
  tier: SkillTier,
  category: Category,
  at: DateTime<Utc>,
) -> Submission {
  let sub = submission(name, &format!("{name}@x.com"), tier, category, at);
  let id = sub.id;
  assert_eq!(
    s.insert_submission(sub, at - Duration::hours(24)).await.unwrap(),
    SubmissionInsert::Inserted
  );
  s.approve_submission(id, at).await.unwrap().unwrap()
}

fn round(title: &str, at: DateTime<Utc>) -> VotingRound {
  VotingRound {
    id:         Uuid::new_v4(),
    title:      title.into(),
    active:     true,
    created_at: at,
    closes_at:  at + Duration::days(7),
    closed_at:  None,
  }
}

fn ballot(round_id: Uuid, sub: &Submission, voter: &str, at: DateTime<Utc>) -> Ballot {
  Ballot {
    id:            Uuid::new_v4(),
    round_id,
    submission_id: sub.id,
    voter_contact: contact(voter),
    voter_name:    "Voter".into(),
    skill_tier:    sub.skill_tier,
    cast_at:       at,
  }
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_submission() {
  let s = store().await;
  let sub = submission("Ana", "ana@x.com", SkillTier::Beginner, Category::Weekly, t0());

  let outcome = s.insert_submission(sub.clone(), t0() - Duration::hours(24)).await.unwrap();
  assert_eq!(outcome, SubmissionInsert::Inserted);

  let fetched = s.get_submission(sub.id).await.unwrap().unwrap();
  assert_eq!(fetched, sub);
  assert!(!fetched.approved);
}

#[tokio::test]
async fn get_submission_missing_returns_none() {
  let s = store().await;
  assert!(s.get_submission(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn insert_is_refused_inside_cooldown_window() {
  let s = store().await;
  let first = submission("Ana", "ana@x.com", SkillTier::Beginner, Category::Free, t0());
  s.insert_submission(first, t0() - Duration::hours(24)).await.unwrap();

  let later = t0() + Duration::hours(3);
  let second = submission("Ana", "ANA@x.com", SkillTier::Beginner, Category::Free, later);
  let outcome = s.insert_submission(second.clone(), later - Duration::hours(24)).await.unwrap();
  assert_eq!(outcome, SubmissionInsert::CoolingDown { last: t0() });
  assert!(s.get_submission(second.id).await.unwrap().is_none());

  let next_day = t0() + Duration::hours(24);
  let third = submission("Ana", "ana@x.com", SkillTier::Beginner, Category::Free, next_day);
  let outcome = s.insert_submission(third, next_day - Duration::hours(24)).await.unwrap();
  assert_eq!(outcome, SubmissionInsert::Inserted);
  assert_eq!(s.last_submission_at(&contact("ana@x.com")).await.unwrap(), Some(next_day));
}

#[tokio::test]
async fn list_filters_and_orders_newest_first() {
  let s = store().await;
  for (i, (name, tier, category)) in [
    ("Ana", SkillTier::Beginner, Category::Weekly),
    ("Bruno", SkillTier::Advanced, Category::Free),
    ("Carla", SkillTier::Beginner, Category::Daily),
  ]
  .into_iter()
  .enumerate()
  {
    let at = t0() + Duration::minutes(i as i64);
    let sub = submission(name, &format!("{name}@x.com"), tier, category, at);
    s.insert_submission(sub, at - Duration::hours(24)).await.unwrap();
  }

  let all = s.list_submissions(&SubmissionFilter::default()).await.unwrap();
  let names: Vec<_> = all.iter().map(|s| s.artist_name.as_str()).collect();
  assert_eq!(names, ["Carla", "Bruno", "Ana"]);

  let beginners = s
    .list_submissions(&SubmissionFilter {
      tier: Some(SkillTier::Beginner),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(beginners.len(), 2);

  let by_text = s
    .list_submissions(&SubmissionFilter {
      text: Some("BRU".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);
  assert_eq!(by_text[0].artist_name, "Bruno");

  let contact_probe = SubmissionFilter {
    text: Some("carla@".into()),
    ..Default::default()
  };
  assert!(s.list_submissions(&contact_probe).await.unwrap().is_empty());
  let by_contact = s
    .list_submissions(&SubmissionFilter {
      search_contacts: true,
      ..contact_probe
    })
    .await
    .unwrap();
  assert_eq!(by_contact.len(), 1);
  assert_eq!(by_contact[0].artist_name, "Carla");

  let approved = s
    .list_submissions(&SubmissionFilter {
      status: ReviewStatus::Approved,
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(approved.is_empty());
}

#[tokio::test]
async fn approve_keeps_first_timestamp() {
  let s = store().await;
  let sub = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  assert!(sub.approved);
  assert_eq!(sub.approved_at, Some(t0()));

  let again = s
    .approve_submission(sub.id, t0() + Duration::hours(1))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(again.approved_at, Some(t0()));

  assert!(s.approve_submission(Uuid::new_v4(), t0()).await.unwrap().is_none());
}

// ─── Rounds ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_round_snapshots_only_approved_non_free() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Advanced, Category::Daily, t0()).await;
  let free = approved(&s, "Caio", SkillTier::Beginner, Category::Free, t0()).await;
  let pending = submission("Dani", "dani@x.com", SkillTier::Beginner, Category::Weekly, t0());
  s.insert_submission(pending.clone(), t0() - Duration::hours(24)).await.unwrap();

  let r = round("Week 1", t0());
  let outcome = s
    .create_round(r.clone(), vec![a.id, b.id, free.id, pending.id, a.id], 2)
    .await
    .unwrap();
  assert_eq!(outcome, RoundCreation::Created { members: 2 });

  let members = s.round_members(r.id).await.unwrap();
  let ids: Vec<_> = members.iter().map(|m| m.id).collect();
  assert_eq!(ids.len(), 2);
  assert!(ids.contains(&a.id) && ids.contains(&b.id));
  assert!(members.iter().all(|m| m.eligible_for_voting && m.is_round_candidate()));

  assert!(!s.get_submission(free.id).await.unwrap().unwrap().eligible_for_voting);
  assert_eq!(s.active_round().await.unwrap().unwrap().id, r.id);
}

#[tokio::test]
async fn insufficient_candidates_changes_nothing() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let first = round("Week 1", t0());
  s.create_round(first.clone(), vec![a.id, b.id], 2).await.unwrap();

  let second = round("Week 2", t0() + Duration::days(1));
  let outcome = s.create_round(second.clone(), vec![a.id], 3).await.unwrap();
  assert_eq!(outcome, RoundCreation::InsufficientCandidates { found: 1 });

  assert!(s.get_round(second.id).await.unwrap().is_none());
  let active = s.active_round().await.unwrap().unwrap();
  assert_eq!(active.id, first.id);
  assert!(s.get_submission(a.id).await.unwrap().unwrap().eligible_for_voting);
}

#[tokio::test]
async fn new_round_deactivates_previous() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;

  let first = round("Week 1", t0());
  s.create_round(first.clone(), vec![a.id, b.id], 2).await.unwrap();
  let second = round("Week 2", t0() + Duration::days(7));
  s.create_round(second.clone(), vec![a.id, b.id], 2).await.unwrap();

  let rounds = s.list_rounds().await.unwrap();
  assert_eq!(rounds.len(), 2);
  assert_eq!(rounds[0].id, second.id);
  assert!(rounds[0].active);
  assert!(!rounds[1].active);
  assert!(rounds[1].closed_at.is_some());
  assert!(s.consistency_report().await.unwrap().is_clean());
}

#[tokio::test]
async fn close_round_keeps_ballots_and_clears_flags() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id], 2).await.unwrap();
  s.insert_ballot(ballot(r.id, &a, "v@x.com", t0())).await.unwrap();

  let closed = s.close_round(r.id, t0() + Duration::days(1)).await.unwrap().unwrap();
  assert!(!closed.active);
  assert_eq!(closed.closed_at, Some(t0() + Duration::days(1)));
  assert!(s.active_round().await.unwrap().is_none());
  assert_eq!(s.list_ballots(r.id).await.unwrap().len(), 1);
  assert!(!s.get_submission(a.id).await.unwrap().unwrap().eligible_for_voting);

  assert!(s.close_round(Uuid::new_v4(), t0()).await.unwrap().is_none());
}

#[tokio::test]
async fn teardown_removes_everything_and_is_repeatable() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id], 2).await.unwrap();
  s.insert_ballot(ballot(r.id, &a, "v1@x.com", t0())).await.unwrap();
  s.insert_ballot(ballot(r.id, &b, "v2@x.com", t0())).await.unwrap();

  let report = s.teardown_round(r.id).await.unwrap();
  assert!(report.round_found);
  assert_eq!(report.ballots_deleted, 2);
  assert_eq!(report.members_detached, 2);
  assert_eq!(report.flags_cleared, 2);

  assert!(s.get_round(r.id).await.unwrap().is_none());
  assert!(s.list_ballots(r.id).await.unwrap().is_empty());
  assert!(!s.get_submission(a.id).await.unwrap().unwrap().eligible_for_voting);

  let again = s.teardown_round(r.id).await.unwrap();
  assert!(again.is_noop());
}

// ─── Ballots ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_ballot_per_tier_is_rejected_by_constraint() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let c = approved(&s, "Cris", SkillTier::Advanced, Category::Weekly, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id, c.id], 2).await.unwrap();

  let first = s.insert_ballot(ballot(r.id, &a, "alice@x.com", t0())).await.unwrap();
  assert_eq!(first, BallotInsert::Inserted);

  let dup = s.insert_ballot(ballot(r.id, &b, "Alice@X.com", t0())).await.unwrap();
  assert_eq!(dup, BallotInsert::Duplicate);

  let other_tier = s.insert_ballot(ballot(r.id, &c, "alice@x.com", t0())).await.unwrap();
  assert_eq!(other_tier, BallotInsert::Inserted);

  let mut tiers = s.voted_tiers(r.id, &contact("alice@x.com")).await.unwrap();
  tiers.sort();
  assert_eq!(tiers, [SkillTier::Beginner, SkillTier::Advanced]);
}

#[tokio::test]
async fn ballot_for_non_member_is_an_error() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let outsider = approved(&s, "Caio", SkillTier::Beginner, Category::Free, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id], 2).await.unwrap();

  assert_eq!(
    s.insert_ballot(ballot(r.id, &outsider, "v@x.com", t0())).await.unwrap(),
    BallotInsert::NotMember
  );
  assert!(s.list_ballots(r.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ballot_after_close_is_refused() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id], 2).await.unwrap();
  s.close_round(r.id, t0() + Duration::hours(1)).await.unwrap().unwrap();

  let late = s.insert_ballot(ballot(r.id, &a, "late@x.com", t0() + Duration::hours(2))).await;
  assert_eq!(late.unwrap(), BallotInsert::RoundClosed);
  assert!(s.list_ballots(r.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ballot_past_deadline_is_refused() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id], 2).await.unwrap();

  let at_deadline = ballot(r.id, &a, "v@x.com", r.closes_at);
  assert_eq!(s.insert_ballot(at_deadline).await.unwrap(), BallotInsert::RoundClosed);
  assert!(s.list_ballots(r.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ballot_into_replaced_or_missing_round_is_refused() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let first = round("Week 1", t0());
  s.create_round(first.clone(), vec![a.id, b.id], 2).await.unwrap();
  let second = round("Week 2", t0() + Duration::hours(1));
  s.create_round(second.clone(), vec![a.id, b.id], 2).await.unwrap();

  let stale = ballot(first.id, &a, "v@x.com", t0() + Duration::hours(2));
  assert_eq!(s.insert_ballot(stale).await.unwrap(), BallotInsert::RoundClosed);

  s.teardown_round(first.id).await.unwrap();
  let gone = ballot(first.id, &a, "v@x.com", t0() + Duration::hours(2));
  assert_eq!(s.insert_ballot(gone).await.unwrap(), BallotInsert::RoundMissing);
  assert!(s.list_ballots(first.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_member_cascades_its_ballots() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id], 2).await.unwrap();
  s.insert_ballot(ballot(r.id, &a, "v@x.com", t0())).await.unwrap();

  let deleted = s.delete_submission(a.id).await.unwrap().unwrap();
  assert_eq!(deleted.id, a.id);
  assert!(s.list_ballots(r.id).await.unwrap().is_empty());
  assert_eq!(s.round_members(r.id).await.unwrap().len(), 1);
  assert!(s.delete_submission(a.id).await.unwrap().is_none());
  assert!(s.consistency_report().await.unwrap().is_clean());
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn repair_clears_stale_flags() {
  let s = store().await;
  let a = approved(&s, "Ana", SkillTier::Beginner, Category::Weekly, t0()).await;
  let b = approved(&s, "Bia", SkillTier::Beginner, Category::Weekly, t0()).await;
  let r = round("Week 1", t0());
  s.create_round(r.clone(), vec![a.id, b.id], 2).await.unwrap();

  // Deactivate the round without touching its members.
  s.conn
    .call(|conn| {
      conn.execute("UPDATE rounds SET active = 0", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let report = s.consistency_report().await.unwrap();
  assert!(!report.is_clean());
  assert_eq!(report.stale_eligible.len(), 2);

  let repaired = s.repair_consistency().await.unwrap();
  assert_eq!(repaired, report);
  assert!(s.consistency_report().await.unwrap().is_clean());
  assert!(!s.get_submission(a.id).await.unwrap().unwrap().eligible_for_voting);
}
