//! SQL schema for the Gather SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id   TEXT PRIMARY KEY,
    username      TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,  -- stored lowercase; the login key
    password_hash TEXT NOT NULL,         -- argon2 PHC string, never serialised
    created_at    TEXT NOT NULL          -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS events (
    event_id    TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    location    TEXT NOT NULL,
    date        TEXT NOT NULL,
    capacity    INTEGER NOT NULL CHECK (capacity > 0),
    image_path  TEXT,                    -- relative /uploads path or NULL
    owner_id    TEXT NOT NULL REFERENCES identities(identity_id),
    created_at  TEXT NOT NULL
);

-- Enrollment order is insertion order (rowid). The UNIQUE constraint is the
-- backstop for the no-duplicate-attendee invariant; the enrollment
-- transaction checks it explicitly first to report the condition cleanly.
CREATE TABLE IF NOT EXISTS attendees (
    event_id    TEXT NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    identity_id TEXT NOT NULL REFERENCES identities(identity_id),
    enrolled_at TEXT NOT NULL,
    UNIQUE (event_id, identity_id)
);

CREATE INDEX IF NOT EXISTS attendees_event_idx ON attendees(event_id);
CREATE INDEX IF NOT EXISTS events_owner_idx    ON events(owner_id);

PRAGMA user_version = 1;
";
