//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: cards and mastery with optimistic versioning",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Review log with client review ids for idempotent submission",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
///
/// Timestamps are RFC 3339 strings with fixed microsecond precision and a
/// `Z` suffix, so lexical order matches chronological order.
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    source_kind TEXT NOT NULL DEFAULT 'direct',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_owner_created ON cards(owner, created_at);

-- One row per card, written lazily on first review
CREATE TABLE IF NOT EXISTS mastery (
    card_id TEXT PRIMARY KEY REFERENCES cards(id) ON DELETE CASCADE,
    ease REAL NOT NULL DEFAULT 2.5 CHECK (ease >= 1.3 AND ease <= 3.0),
    interval_days INTEGER NOT NULL DEFAULT 0 CHECK (interval_days >= 0),
    reps INTEGER NOT NULL DEFAULT 0 CHECK (reps >= 0),
    lapses INTEGER NOT NULL DEFAULT 0 CHECK (lapses >= 0),
    due_at TEXT NOT NULL,
    last_reviewed_at TEXT,

    -- Optimistic concurrency: bumped on every write, absent row = version 0
    version INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_mastery_due ON mastery(due_at);

CREATE TRIGGER IF NOT EXISTS mastery_lapses_monotonic
BEFORE UPDATE OF lapses ON mastery
WHEN NEW.lapses < OLD.lapses
BEGIN
    SELECT RAISE(ABORT, 'lapses must not decrease');
END;

INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Review log
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    client_review_id TEXT,
    quality INTEGER NOT NULL CHECK (quality >= 1 AND quality <= 4),
    reviewed_at TEXT NOT NULL,

    -- Before/after snapshot so analytics never need to replay the scheduler
    ease_before REAL NOT NULL,
    ease_after REAL NOT NULL,
    interval_before INTEGER NOT NULL,
    interval_after INTEGER NOT NULL,
    reps_after INTEGER NOT NULL,
    lapses_after INTEGER NOT NULL,
    due_at_after TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_client_id
    ON reviews(owner, client_review_id)
    WHERE client_review_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_id, reviewed_at);

INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(migration.up)?;
            tx.commit()?;

            applied += 1;
        }
    }

    Ok(applied)
}
