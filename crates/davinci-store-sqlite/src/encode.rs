//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that lexical order equals chronological order and SQL range
//! comparisons work. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use davinci_core::{
  ballot::Ballot,
  contact::Contact,
  round::VotingRound,
  submission::{Category, SkillTier, Submission},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_tier(t: SkillTier) -> &'static str { t.as_str() }

pub fn decode_tier(s: &str) -> Result<SkillTier> { Ok(s.parse()?) }

pub fn encode_category(c: Category) -> &'static str { c.as_str() }

pub fn decode_category(s: &str) -> Result<Category> { Ok(s.parse()?) }

pub fn decode_contact(s: &str) -> Result<Contact> { Ok(Contact::parse(s)?) }

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// Column list matching [`RawSubmission::from_row`].
pub const SUBMISSION_COLUMNS: &str = "s.submission_id, s.artist_name, s.contact, s.skill_tier, \
   s.category, s.file_url, s.approved, s.approved_at, s.eligible, s.created_at";

/// Untyped submission row as read from SQLite.
pub struct RawSubmission {
  pub submission_id: String,
  pub artist_name:   String,
  pub contact:       String,
  pub skill_tier:    String,
  pub category:      String,
  pub file_url:      String,
  pub approved:      bool,
  pub approved_at:   Option<String>,
  pub eligible:      bool,
  pub created_at:    String,
}

impl RawSubmission {
  /// Read the [`SUBMISSION_COLUMNS`] starting at column 0.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id: row.get(0)?,
      artist_name:   row.get(1)?,
      contact:       row.get(2)?,
      skill_tier:    row.get(3)?,
      category:      row.get(4)?,
      file_url:      row.get(5)?,
      approved:      row.get(6)?,
      approved_at:   row.get(7)?,
      eligible:      row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_submission(self) -> Result<Submission> {
    Ok(Submission {
      id:                  decode_uuid(&self.submission_id)?,
      artist_name:         self.artist_name,
      contact:             decode_contact(&self.contact)?,
      skill_tier:          decode_tier(&self.skill_tier)?,
      category:            decode_category(&self.category)?,
      file_url:            self.file_url,
      approved:            self.approved,
      approved_at:         decode_opt_dt(self.approved_at)?,
      eligible_for_voting: self.eligible,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

pub const ROUND_COLUMNS: &str = "round_id, title, active, created_at, closes_at, closed_at";

pub struct RawRound {
  pub round_id:   String,
  pub title:      String,
  pub active:     bool,
  pub created_at: String,
  pub closes_at:  String,
  pub closed_at:  Option<String>,
}

impl RawRound {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      round_id:   row.get(0)?,
      title:      row.get(1)?,
      active:     row.get(2)?,
      created_at: row.get(3)?,
      closes_at:  row.get(4)?,
      closed_at:  row.get(5)?,
    })
  }

  pub fn into_round(self) -> Result<VotingRound> {
    Ok(VotingRound {
      id:         decode_uuid(&self.round_id)?,
      title:      self.title,
      active:     self.active,
      created_at: decode_dt(&self.created_at)?,
      closes_at:  decode_dt(&self.closes_at)?,
      closed_at:  decode_opt_dt(self.closed_at)?,
    })
  }
}

pub const BALLOT_COLUMNS: &str =
  "ballot_id, round_id, submission_id, voter_contact, voter_name, skill_tier, cast_at";

pub struct RawBallot {
  pub ballot_id:     String,
  pub round_id:      String,
  pub submission_id: String,
  pub voter_contact: String,
  pub voter_name:    String,
  pub skill_tier:    String,
  pub cast_at:       String,
}

impl RawBallot {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ballot_id:     row.get(0)?,
      round_id:      row.get(1)?,
      submission_id: row.get(2)?,
      voter_contact: row.get(3)?,
      voter_name:    row.get(4)?,
      skill_tier:    row.get(5)?,
      cast_at:       row.get(6)?,
    })
  }

  pub fn into_ballot(self) -> Result<Ballot> {
    Ok(Ballot {
      id:            decode_uuid(&self.ballot_id)?,
      round_id:      decode_uuid(&self.round_id)?,
      submission_id: decode_uuid(&self.submission_id)?,
      voter_contact: decode_contact(&self.voter_contact)?,
      voter_name:    self.voter_name,
      skill_tier:    decode_tier(&self.skill_tier)?,
      cast_at:       decode_dt(&self.cast_at)?,
    })
  }
}
