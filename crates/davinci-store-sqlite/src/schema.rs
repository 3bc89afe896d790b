//! SQL schema for the Davinci SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS submissions (
    submission_id TEXT PRIMARY KEY,
    artist_name   TEXT NOT NULL,
    contact       TEXT NOT NULL,   -- normalised phone or email
    skill_tier    TEXT NOT NULL,   -- 'beginner' | 'intermediate' | 'advanced'
    category      TEXT NOT NULL,   -- 'free' | 'daily' | 'weekly' | 'monthly'
    file_url      TEXT NOT NULL,
    approved      INTEGER NOT NULL DEFAULT 0,
    approved_at   TEXT,
    eligible      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL    -- fixed-width RFC 3339 UTC, sorts lexically
);

CREATE TABLE IF NOT EXISTS rounds (
    round_id   TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    active     INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    closes_at  TEXT NOT NULL,
    closed_at  TEXT
);

-- Single active round.
CREATE UNIQUE INDEX IF NOT EXISTS rounds_one_active_idx
    ON rounds(active) WHERE active = 1;

CREATE TABLE IF NOT EXISTS round_members (
    round_id      TEXT NOT NULL REFERENCES rounds(round_id) ON DELETE CASCADE,
    submission_id TEXT NOT NULL REFERENCES submissions(submission_id) ON DELETE CASCADE,
    PRIMARY KEY (round_id, submission_id)
);

-- Ballots are never updated. A ballot always points at an existing
-- membership, so removing a membership removes its ballots.
CREATE TABLE IF NOT EXISTS ballots (
    ballot_id     TEXT PRIMARY KEY,
    round_id      TEXT NOT NULL,
    submission_id TEXT NOT NULL,
    voter_contact TEXT NOT NULL,
    voter_name    TEXT NOT NULL,
    skill_tier    TEXT NOT NULL,
    cast_at       TEXT NOT NULL,
    FOREIGN KEY (round_id, submission_id)
        REFERENCES round_members(round_id, submission_id) ON DELETE CASCADE,
    UNIQUE (round_id, voter_contact, skill_tier)
);

CREATE INDEX IF NOT EXISTS submissions_contact_idx ON submissions(contact, created_at);
CREATE INDEX IF NOT EXISTS submissions_created_idx ON submissions(created_at);
CREATE INDEX IF NOT EXISTS members_submission_idx  ON round_members(submission_id);
CREATE INDEX IF NOT EXISTS ballots_member_idx      ON ballots(round_id, submission_id);

PRAGMA user_version = 1;
";
