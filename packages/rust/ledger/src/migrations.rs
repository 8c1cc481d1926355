//! SQL migration definitions for the delivery ledger database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: delivered_cases, enrichment_cache, runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Cases already delivered in a digest; membership here is what "already
-- sent" means, so rows are only written after delivery succeeds.
CREATE TABLE IF NOT EXISTS delivered_cases (
    case_id      TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    issued_at    TEXT NOT NULL,
    delivered_at TEXT NOT NULL,
    precedential INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_delivered_cases_delivered_at ON delivered_cases(delivered_at);

-- LLM enrichment cache, keyed by what was asked of which model
CREATE TABLE IF NOT EXISTS enrichment_cache (
    id          TEXT PRIMARY KEY,
    case_id     TEXT NOT NULL,
    prompt_hash TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    summary     TEXT NOT NULL,
    category    TEXT,
    created_at  TEXT NOT NULL,
    UNIQUE(case_id, prompt_hash, model_id)
);

CREATE INDEX IF NOT EXISTS idx_enrichment_case ON enrichment_cache(case_id);

-- Pipeline run history
CREATE TABLE IF NOT EXISTS runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
