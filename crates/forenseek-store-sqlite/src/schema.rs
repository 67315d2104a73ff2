//! SQL schema for the ForenSeek local store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- At most one signed-in session.
CREATE TABLE IF NOT EXISTS session (
    id        INTEGER PRIMARY KEY CHECK (id = 1),
    token     TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    role      TEXT NOT NULL,   -- 'admin' | 'perito' | 'assistente' | ...
    saved_at  TEXT NOT NULL    -- ISO 8601 UTC
);

-- Evidence recorded on this device, in enqueue (rowid) order.
CREATE TABLE IF NOT EXISTS evidence_outbox (
    queue_id     TEXT PRIMARY KEY,
    case_id      TEXT NOT NULL,
    payload_json TEXT NOT NULL,    -- NewEvidence as sent to POST /evidence
    queued_at    TEXT NOT NULL,
    attempts     INTEGER NOT NULL DEFAULT 0,
    last_error   TEXT,
    state        TEXT NOT NULL DEFAULT 'pending',
    remote_id    TEXT,             -- set when state = 'sent'
    reason       TEXT,             -- set when state = 'rejected'
    resolved_at  TEXT,             -- set when state leaves 'pending'
    CHECK (state IN ('pending', 'sent', 'rejected'))
);

CREATE INDEX IF NOT EXISTS outbox_state_idx ON evidence_outbox(state);
CREATE INDEX IF NOT EXISTS outbox_case_idx  ON evidence_outbox(case_id);

PRAGMA user_version = 1;
";
