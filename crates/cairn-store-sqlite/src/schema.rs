//! SQL schema for the Cairn SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS articles (
    id             TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    content        TEXT NOT NULL,
    category       TEXT NOT NULL,
    uid            TEXT NOT NULL,     -- author uid
    display_name   TEXT,
    created_at     TEXT NOT NULL,     -- RFC 3339 UTC, microseconds; server-assigned
    updated_at     TEXT,
    status         TEXT NOT NULL,     -- 'pending' | 'approved' | 'rejected'
    is_featured    INTEGER NOT NULL DEFAULT 0,
    refs           TEXT,
    summary        TEXT,
    image_url      TEXT,
    review_comment TEXT,
    reviewed_at    TEXT
);

-- Profile documents keyed by auth uid. is_admin mirrors the admin claim.
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY,
    display_name TEXT,
    email        TEXT,
    photo_url    TEXT,
    is_admin     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS notifications (
    id         TEXT PRIMARY KEY,
    uid        TEXT NOT NULL,         -- receiver
    message    TEXT NOT NULL,
    kind       TEXT NOT NULL,
    read       INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    article_id TEXT
);

-- Identity records. Claims are the authoritative source for authorisation.
CREATE TABLE IF NOT EXISTS accounts (
    uid           TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,      -- argon2 PHC string
    display_name  TEXT,
    photo_url     TEXT,
    claims        TEXT NOT NULL DEFAULT '{}',
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 of a session token is ever stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    uid        TEXT NOT NULL REFERENCES accounts(uid),
    issued_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS articles_status_idx   ON articles(status, created_at);
CREATE INDEX IF NOT EXISTS articles_uid_idx      ON articles(uid);
CREATE INDEX IF NOT EXISTS articles_category_idx ON articles(category);
CREATE INDEX IF NOT EXISTS notifications_uid_idx ON notifications(uid, read);

PRAGMA user_version = 1;
";
