//! [`SqliteStore`] — the SQLite implementation of [`CommunityStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, ffi};
use uuid::Uuid;

use davinci_core::{
  ballot::{Ballot, BallotInsert},
  contact::Contact,
  round::{ConsistencyReport, RoundCreation, TeardownReport, VotingRound},
  store::{CommunityStore, SubmissionInsert},
  submission::{ReviewStatus, SkillTier, Submission, SubmissionFilter},
};

use crate::{
  Result,
  encode::{
    BALLOT_COLUMNS, ROUND_COLUMNS, RawBallot, RawRound, RawSubmission,
    SUBMISSION_COLUMNS, decode_dt, decode_tier, decode_uuid, encode_category,
    encode_dt, encode_tier, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Davinci record store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Every call
/// runs on the connection's own thread, one at a time, so a single statement
/// or transaction is atomic with respect to every other caller.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_submission(&self, id_str: String) -> Result<Option<Submission>> {
    let raw: Option<RawSubmission> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SUBMISSION_COLUMNS} FROM submissions s WHERE s.submission_id = ?1"
              ),
              rusqlite::params![id_str],
              RawSubmission::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubmission::into_submission).transpose()
  }

  async fn fetch_round(&self, filter: &str, id: Option<String>) -> Result<Option<VotingRound>> {
    let sql = format!("SELECT {ROUND_COLUMNS} FROM rounds {filter}");
    let raw: Option<RawRound> = self
      .conn
      .call(move |conn| {
        let row = match id {
          Some(id) => conn
            .query_row(&sql, rusqlite::params![id], RawRound::from_row)
            .optional()?,
          None => conn.query_row(&sql, [], RawRound::from_row).optional()?,
        };
        Ok(row)
      })
      .await?;

    raw.map(RawRound::into_round).transpose()
  }
}

// ─── Reconciliation helpers ──────────────────────────────────────────────────

const ACTIVE_MEMBERS: &str = "SELECT m.submission_id FROM round_members m
   JOIN rounds r ON r.round_id = m.round_id
   WHERE r.active = 1";

/// Id lists making up a [`ConsistencyReport`], still undecoded.
struct RawReport {
  stale_eligible:   Vec<String>,
  missing_eligible: Vec<String>,
  orphan_ballots:   Vec<String>,
  active_rounds:    Vec<String>,
}

fn query_ids(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map([], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()
}

fn collect_report(conn: &rusqlite::Connection) -> rusqlite::Result<RawReport> {
  Ok(RawReport {
    stale_eligible:   query_ids(
      conn,
      &format!(
        "SELECT submission_id FROM submissions
         WHERE eligible = 1 AND submission_id NOT IN ({ACTIVE_MEMBERS})"
      ),
    )?,
    missing_eligible: query_ids(
      conn,
      "SELECT s.submission_id FROM submissions s
       JOIN round_members m ON m.submission_id = s.submission_id
       JOIN rounds r        ON r.round_id      = m.round_id
       WHERE r.active = 1 AND s.eligible = 0",
    )?,
    orphan_ballots:   query_ids(
      conn,
      "SELECT b.ballot_id FROM ballots b
       LEFT JOIN round_members m
         ON m.round_id = b.round_id AND m.submission_id = b.submission_id
       WHERE m.round_id IS NULL",
    )?,
    active_rounds:    query_ids(
      conn,
      "SELECT round_id FROM rounds WHERE active = 1 ORDER BY created_at DESC",
    )?,
  })
}

fn decode_ids(ids: Vec<String>) -> Result<Vec<Uuid>> {
  ids.iter().map(|s| decode_uuid(s)).collect()
}

impl RawReport {
  fn into_report(self) -> Result<ConsistencyReport> {
    Ok(ConsistencyReport {
      stale_eligible:   decode_ids(self.stale_eligible)?,
      missing_eligible: decode_ids(self.missing_eligible)?,
      orphan_ballots:   decode_ids(self.orphan_ballots)?,
      active_rounds:    decode_ids(self.active_rounds)?,
    })
  }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
  )
}

fn round_exists(conn: &rusqlite::Connection, round_id: &str) -> rusqlite::Result<bool> {
  conn
    .query_row("SELECT 1 FROM rounds WHERE round_id = ?1", [round_id], |_| Ok(()))
    .optional()
    .map(|found| found.is_some())
}

// ─── CommunityStore impl ─────────────────────────────────────────────────────

impl CommunityStore for SqliteStore {
  type Error = crate::Error;

  // ── Submissions ───────────────────────────────────────────────────────────

  async fn insert_submission(
    &self,
    submission: Submission,
    not_since:  DateTime<Utc>,
  ) -> Result<SubmissionInsert> {
    let id_str        = encode_uuid(submission.id);
    let contact       = submission.contact.as_str().to_owned();
    let tier          = encode_tier(submission.skill_tier);
    let category      = encode_category(submission.category);
    let approved_at   = submission.approved_at.map(encode_dt);
    let created_at    = encode_dt(submission.created_at);
    let not_since_str = encode_dt(not_since);

    let last: Option<String> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO submissions (
             submission_id, artist_name, contact, skill_tier, category,
             file_url, approved, approved_at, eligible, created_at
           )
           SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10
           WHERE NOT EXISTS (
             SELECT 1 FROM submissions WHERE contact = ?3 AND created_at > ?11
           )",
          rusqlite::params![
            id_str,
            submission.artist_name,
            contact,
            tier,
            category,
            submission.file_url,
            submission.approved,
            approved_at,
            submission.eligible_for_voting,
            created_at,
            not_since_str,
          ],
        )?;

        if inserted == 1 {
          return Ok(None);
        }

        let last: Option<String> = conn.query_row(
          "SELECT MAX(created_at) FROM submissions WHERE contact = ?1",
          rusqlite::params![contact],
          |r| r.get(0),
        )?;
        Ok(last)
      })
      .await?;

    match last {
      None => Ok(SubmissionInsert::Inserted),
      Some(s) => Ok(SubmissionInsert::CoolingDown { last: decode_dt(&s)? }),
    }
  }

  async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>> {
    self.fetch_submission(encode_uuid(id)).await
  }

  async fn last_submission_at(&self, contact: &Contact) -> Result<Option<DateTime<Utc>>> {
    let contact = contact.as_str().to_owned();

    let last: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MAX(created_at) FROM submissions WHERE contact = ?1",
          rusqlite::params![contact],
          |r| r.get(0),
        )?)
      })
      .await?;

    last.as_deref().map(decode_dt).transpose()
  }

  async fn list_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
    let approved: Option<bool> = match filter.status {
      ReviewStatus::Pending => Some(false),
      ReviewStatus::Approved => Some(true),
      ReviewStatus::Any => None,
    };
    let text = filter
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty());
    let name_pattern    = text.map(|t| format!("%{}%", t.to_lowercase()));
    let contact_pattern = text
      .filter(|_| filter.search_contacts)
      .map(|t| format!("%{t}%"));
    let tier            = filter.tier.map(encode_tier);
    let category        = filter.category.map(encode_category);
    let limit_val       = filter.limit.map(|l| l as i64).unwrap_or(-1);
    let offset_val      = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBMISSION_COLUMNS} FROM submissions s
           WHERE (?1 IS NULL OR s.approved = ?1)
             AND (?2 IS NULL OR lower(s.artist_name) LIKE ?2 OR s.contact LIKE ?3)
             AND (?4 IS NULL OR s.skill_tier = ?4)
             AND (?5 IS NULL OR s.category = ?5)
           ORDER BY s.created_at DESC, s.submission_id
           LIMIT ?6 OFFSET ?7"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              approved,
              name_pattern,
              contact_pattern,
              tier,
              category,
              limit_val,
              offset_val,
            ],
            RawSubmission::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn approve_submission(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Submission>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    let updated = {
      let id_str = id_str.clone();
      self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            "UPDATE submissions
             SET approved = 1, approved_at = COALESCE(approved_at, ?2)
             WHERE submission_id = ?1",
            rusqlite::params![id_str, at_str],
          )?)
        })
        .await?
    };

    if updated == 0 {
      return Ok(None);
    }
    self.fetch_submission(id_str).await
  }

  async fn delete_submission(&self, id: Uuid) -> Result<Option<Submission>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubmission> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            &format!(
              "SELECT {SUBMISSION_COLUMNS} FROM submissions s WHERE s.submission_id = ?1"
            ),
            rusqlite::params![id_str],
            RawSubmission::from_row,
          )
          .optional()?;
        if raw.is_some() {
          tx.execute(
            "DELETE FROM submissions WHERE submission_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawSubmission::into_submission).transpose()
  }

  // ── Rounds ────────────────────────────────────────────────────────────────

  async fn create_round(
    &self,
    round:       VotingRound,
    candidates:  Vec<Uuid>,
    min_members: usize,
  ) -> Result<RoundCreation> {
    let round_id   = encode_uuid(round.id);
    let created_at = encode_dt(round.created_at);
    let closes_at  = encode_dt(round.closes_at);
    let candidates: Vec<String> = candidates.into_iter().map(encode_uuid).collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute("UPDATE submissions SET eligible = 0 WHERE eligible = 1", [])?;
        tx.execute(
          "UPDATE rounds SET active = 0, closed_at = COALESCE(closed_at, ?1)
           WHERE active = 1",
          rusqlite::params![created_at],
        )?;
        tx.execute(
          "INSERT INTO rounds (round_id, title, active, created_at, closes_at)
           VALUES (?1, ?2, 1, ?3, ?4)",
          rusqlite::params![round_id, round.title, created_at, closes_at],
        )?;

        let mut members = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO round_members (round_id, submission_id)
             SELECT ?1, submission_id FROM submissions
             WHERE submission_id = ?2 AND approved = 1 AND category != 'free'",
          )?;
          for candidate in &candidates {
            members += stmt.execute(rusqlite::params![round_id, candidate])?;
          }
        }

        if members < min_members {
          // Dropping the transaction rolls every statement back.
          return Ok(RoundCreation::InsufficientCandidates { found: members });
        }

        tx.execute(
          "UPDATE submissions SET eligible = 1
           WHERE submission_id IN (
             SELECT submission_id FROM round_members WHERE round_id = ?1
           )",
          rusqlite::params![round_id],
        )?;
        tx.commit()?;
        Ok(RoundCreation::Created { members })
      })
      .await?;

    Ok(outcome)
  }

  async fn get_round(&self, id: Uuid) -> Result<Option<VotingRound>> {
    self
      .fetch_round("WHERE round_id = ?1", Some(encode_uuid(id)))
      .await
  }

  async fn active_round(&self) -> Result<Option<VotingRound>> {
    self
      .fetch_round("WHERE active = 1 ORDER BY created_at DESC LIMIT 1", None)
      .await
  }

  async fn list_rounds(&self) -> Result<Vec<VotingRound>> {
    let raws: Vec<RawRound> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ROUND_COLUMNS} FROM rounds ORDER BY created_at DESC, round_id"
        ))?;
        let rows = stmt
          .query_map([], RawRound::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRound::into_round).collect()
  }

  async fn round_members(&self, round_id: Uuid) -> Result<Vec<Submission>> {
    let round_id = encode_uuid(round_id);

    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBMISSION_COLUMNS} FROM submissions s
           JOIN round_members m ON m.submission_id = s.submission_id
           WHERE m.round_id = ?1
           ORDER BY s.created_at, s.submission_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![round_id], RawSubmission::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn close_round(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<VotingRound>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    let found = {
      let id_str = id_str.clone();
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let was_active: Option<bool> = tx
            .query_row(
              "SELECT active FROM rounds WHERE round_id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?;
          let Some(was_active) = was_active else {
            return Ok(false);
          };
          if was_active {
            tx.execute(
              "UPDATE submissions SET eligible = 0
               WHERE submission_id IN (
                 SELECT submission_id FROM round_members WHERE round_id = ?1
               )",
              rusqlite::params![id_str],
            )?;
            tx.execute(
              "UPDATE rounds SET active = 0, closed_at = ?2 WHERE round_id = ?1",
              rusqlite::params![id_str, at_str],
            )?;
          }
          tx.commit()?;
          Ok(true)
        })
        .await?
    };

    if !found {
      return Ok(None);
    }
    self.get_round(id).await
  }

  async fn teardown_round(&self, id: Uuid) -> Result<TeardownReport> {
    let id_str = encode_uuid(id);

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let was_active: Option<bool> = tx
          .query_row(
            "SELECT active FROM rounds WHERE round_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;

        // Ballots first: none may outlive the membership they point at.
        let ballots_deleted = tx.execute(
          "DELETE FROM ballots WHERE round_id = ?1",
          rusqlite::params![id_str],
        )?;
        let flags_cleared = if was_active == Some(true) {
          tx.execute(
            "UPDATE submissions SET eligible = 0
             WHERE eligible = 1 AND submission_id IN (
               SELECT submission_id FROM round_members WHERE round_id = ?1
             )",
            rusqlite::params![id_str],
          )?
        } else {
          0
        };
        let members_detached = tx.execute(
          "DELETE FROM round_members WHERE round_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute("DELETE FROM rounds WHERE round_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;

        Ok(TeardownReport {
          round_found: was_active.is_some(),
          ballots_deleted,
          members_detached,
          flags_cleared,
        })
      })
      .await?;

    Ok(report)
  }

  // ── Ballots ───────────────────────────────────────────────────────────────

  async fn insert_ballot(&self, ballot: Ballot) -> Result<BallotInsert> {
    let ballot_id     = encode_uuid(ballot.id);
    let round_id      = encode_uuid(ballot.round_id);
    let submission_id = encode_uuid(ballot.submission_id);
    let contact       = ballot.voter_contact.as_str().to_owned();
    let tier          = encode_tier(ballot.skill_tier);
    let cast_at       = encode_dt(ballot.cast_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO ballots (
             ballot_id, round_id, submission_id, voter_contact, voter_name,
             skill_tier, cast_at
           )
           SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
           WHERE EXISTS (
             SELECT 1 FROM rounds
             WHERE round_id = ?2 AND active = 1 AND closes_at > ?7
           )",
          rusqlite::params![
            ballot_id,
            round_id,
            submission_id,
            contact,
            ballot.voter_name,
            tier,
            cast_at,
          ],
        );
        match res {
          Ok(1) => Ok(BallotInsert::Inserted),
          Ok(_) if round_exists(conn, &round_id)? => Ok(BallotInsert::RoundClosed),
          Ok(_) => Ok(BallotInsert::RoundMissing),
          Err(e) if is_unique_violation(&e) => Ok(BallotInsert::Duplicate),
          // The round is open, so a broken membership reference means the
          // submission is not (or no longer) part of it.
          Err(e) if is_foreign_key_violation(&e) => Ok(BallotInsert::NotMember),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(outcome)
  }

  async fn voted_tiers(&self, round_id: Uuid, contact: &Contact) -> Result<Vec<SkillTier>> {
    let round_id = encode_uuid(round_id);
    let contact  = contact.as_str().to_owned();

    let tiers: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT skill_tier FROM ballots WHERE round_id = ?1 AND voter_contact = ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![round_id, contact], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    tiers.iter().map(|t| decode_tier(t)).collect()
  }

  async fn list_ballots(&self, round_id: Uuid) -> Result<Vec<Ballot>> {
    let round_id = encode_uuid(round_id);

    let raws: Vec<RawBallot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BALLOT_COLUMNS} FROM ballots WHERE round_id = ?1
           ORDER BY cast_at, ballot_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![round_id], RawBallot::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBallot::into_ballot).collect()
  }

  // ── Reconciliation ────────────────────────────────────────────────────────

  async fn consistency_report(&self) -> Result<ConsistencyReport> {
    let raw = self.conn.call(|conn| Ok(collect_report(conn)?)).await?;
    raw.into_report()
  }

  async fn repair_consistency(&self) -> Result<ConsistencyReport> {
    let raw = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let found = collect_report(&tx)?;

        // Keep the newest active round; the report lists it first.
        for extra in found.active_rounds.iter().skip(1) {
          tx.execute(
            "UPDATE rounds SET active = 0 WHERE round_id = ?1",
            rusqlite::params![extra],
          )?;
        }
        for ballot in &found.orphan_ballots {
          tx.execute("DELETE FROM ballots WHERE ballot_id = ?1", rusqlite::params![ballot])?;
        }
        tx.execute(
          &format!(
            "UPDATE submissions SET eligible = 0
             WHERE eligible = 1 AND submission_id NOT IN ({ACTIVE_MEMBERS})"
          ),
          [],
        )?;
        tx.execute(
          &format!(
            "UPDATE submissions SET eligible = 1
             WHERE eligible = 0 AND submission_id IN ({ACTIVE_MEMBERS})"
          ),
          [],
        )?;

        tx.commit()?;
        Ok(found)
      })
      .await?;

    let report = raw.into_report()?;
    if !report.is_clean() {
      tracing::warn!(?report, "repaired round state inconsistencies");
    }
    Ok(report)
  }
}
