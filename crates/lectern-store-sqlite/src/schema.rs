//! SQL schema for the Lectern SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Mirror of the external LMS. Reconciliation is the only writer; every
-- mutable column is replaced wholesale on upsert.
CREATE TABLE IF NOT EXISTS courses (
    external_id       TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    section           TEXT,
    description       TEXT,
    owner_external_id TEXT,
    synced_at         TEXT NOT NULL    -- ISO 8601 UTC; store-assigned
);

-- Composite primary key makes repeated roster syncs no-ops.
CREATE TABLE IF NOT EXISTS enrollments (
    student_external_id TEXT NOT NULL,
    course_external_id  TEXT NOT NULL,
    recorded_at         TEXT NOT NULL,
    PRIMARY KEY (student_external_id, course_external_id)
);

-- Row existence is the \"already notified\" dedupe signal. The primary key
-- is what makes insert-if-absent atomic across concurrent passes; no
-- in-process check-then-act is involved.
CREATE TABLE IF NOT EXISTS assignments (
    external_id        TEXT PRIMARY KEY,
    course_external_id TEXT NOT NULL,
    title              TEXT NOT NULL,
    description        TEXT,
    due_date           TEXT,            -- ISO 8601 date or NULL
    created_at         TEXT NOT NULL
);

-- Token history per owner; only the newest row (by created_at) is consulted.
-- A refresh mutates access_token/expires_at in place; rows are never deleted.
CREATE TABLE IF NOT EXISTS credentials (
    credential_id TEXT PRIMARY KEY,
    owner_id      TEXT NOT NULL,
    access_token  TEXT NOT NULL,
    refresh_token TEXT,
    expires_at    TEXT,
    created_at    TEXT NOT NULL
);

-- One row per delivery attempt, never reused. status: 'pending' | 'sent' |
-- 'failed'; a retry is a new row.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    channel         TEXT NOT NULL,    -- 'email' | 'chat' | 'sms'
    recipient       TEXT NOT NULL,
    subject         TEXT,
    body            TEXT,
    status          TEXT NOT NULL DEFAULT 'pending',
    error           TEXT,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS assignments_course_idx   ON assignments(course_external_id);
CREATE INDEX IF NOT EXISTS enrollments_course_idx   ON enrollments(course_external_id);
CREATE INDEX IF NOT EXISTS credentials_owner_idx    ON credentials(owner_id, created_at);
CREATE INDEX IF NOT EXISTS notifications_status_idx ON notifications(status);

PRAGMA user_version = 1;
";
