//! SQLite Storage Implementation
//!
//! Card store: cards, their mastery rows, and the review log.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use crate::card::{Card, CardWithMastery, Mastery, NewCard};
use crate::scheduling::Quality;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Card missing, or owned by someone else
    #[error("Card not found: {0}")]
    NotFound(String),
    /// Optimistic version check failed
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
    /// Client review id already recorded against a different card
    #[error("Client review id {client_review_id} already used for card {card_id}")]
    ClientIdReused {
        client_review_id: String,
        card_id: String,
    },
    /// Rejected input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// RECORDS
// ============================================================================

/// A card with its effective mastery and the stored row version
///
/// `version == 0` means no mastery row exists yet and `mastery` is the
/// lazy default.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRecord {
    pub card: Card,
    pub mastery: Mastery,
    pub version: i64,
}

impl CardRecord {
    /// Whether a mastery row has been persisted for this card
    pub fn has_stored_mastery(&self) -> bool {
        self.version > 0
    }
}

impl From<CardRecord> for CardWithMastery {
    fn from(record: CardRecord) -> Self {
        CardWithMastery {
            card: record.card,
            mastery: record.mastery,
        }
    }
}

/// One applied review, as written to the review log
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReviewRecord {
    pub id: String,
    pub owner: String,
    pub card_id: String,
    pub client_review_id: Option<String>,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
    pub ease_before: f64,
    pub ease_after: f64,
    pub interval_before: i64,
    pub interval_after: i64,
    pub reps_after: i64,
    pub lapses_after: i64,
    pub due_at_after: DateTime<Utc>,
}

impl ReviewRecord {
    /// Mastery state this review produced
    pub fn mastery_after(&self) -> Mastery {
        Mastery {
            card_id: self.card_id.clone(),
            ease: self.ease_after,
            interval_days: self.interval_after,
            reps: self.reps_after,
            lapses: self.lapses_after,
            due_at: self.due_at_after,
            last_reviewed_at: Some(self.reviewed_at),
        }
    }
}

/// Everything needed to persist one review atomically
#[derive(Debug, Clone)]
pub struct ReviewCommit<'a> {
    pub owner: &'a str,
    pub client_review_id: Option<&'a str>,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
    pub before: &'a Mastery,
    pub after: &'a Mastery,
    /// Version read alongside `before`
    pub expected_version: i64,
}

/// Result of [`Storage::commit_review`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Mastery written and review logged
    Applied { review: ReviewRecord, version: i64 },
    /// The client review id was already applied; nothing was written
    Duplicate(ReviewRecord),
}

/// Per-owner collection statistics
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_cards: i64,
    /// Cards that have never been touched (no mastery row)
    pub unseen_cards: i64,
    /// Cards with `reps == 0`, including unseen ones
    pub new_cards: i64,
    /// Cards with `reps >= 1`
    pub mature_cards: i64,
    pub due_now: i64,
    pub total_reviews: i64,
    pub total_lapses: i64,
    /// Mean ease over stored mastery rows
    pub average_ease: Option<f64>,
}

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Canonical storage form: fixed microsecond precision, `Z` suffix
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drop precision the database cannot hold
pub fn normalize_timestamp(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(6)
}

/// Parse RFC3339 timestamp
fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                )),
            )
        })
}

fn parse_quality(value: i64) -> rusqlite::Result<Quality> {
    Quality::try_from(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(e))
    })
}

// ============================================================================
// STORAGE
// ============================================================================

const CARD_WITH_MASTERY_SELECT: &str = "SELECT
        c.id, c.owner, c.front, c.back, c.source_kind, c.created_at,
        m.ease AS m_ease,
        m.interval_days AS m_interval_days,
        m.reps AS m_reps,
        m.lapses AS m_lapses,
        m.due_at AS m_due_at,
        m.last_reviewed_at AS m_last_reviewed_at,
        COALESCE(m.version, 0) AS m_version
    FROM cards c
    LEFT JOIN mastery m ON m.card_id = c.id";

/// Card store backed by SQLite
///
/// Uses separate reader/writer connections (WAL mode) so due-queue reads do
/// not wait behind review commits. All methods take `&self`, making Storage
/// `Send + Sync` for use behind an `Arc`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("CADENCE_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Default database location for this platform
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "cadence", "cadence").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("cadence.db"))
    }

    /// Open (or create) the store. `None` uses [`Storage::default_path`].
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => {
                if let Some(parent) = p.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                p
            }
            None => Self::default_path()?,
        };

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!(path = %path.display(), applied, "Card store schema up to date");
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Create a card. No mastery row is written; the lazy default applies.
    pub fn create_card(&self, input: NewCard, created_at: DateTime<Utc>) -> Result<Card> {
        input.validate().map_err(StorageError::InvalidInput)?;

        let card = Card {
            id: Uuid::new_v4().to_string(),
            front: input.front.trim().to_string(),
            back: input.back.trim().to_string(),
            source_kind: input.effective_source_kind().to_string(),
            owner: input.owner.clone(),
            created_at: normalize_timestamp(created_at),
        };

        {
            let writer = self.writer.lock()
                .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
            writer.execute(
                "INSERT INTO cards (id, owner, front, back, source_kind, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    card.id,
                    card.owner,
                    card.front,
                    card.back,
                    card.source_kind,
                    format_timestamp(card.created_at),
                ],
            )?;
        }

        tracing::debug!(card_id = %card.id, owner = %card.owner, "Card created");
        Ok(card)
    }

    /// Load a card and its effective mastery.
    ///
    /// A card owned by someone else is reported as `NotFound`, so callers
    /// cannot discover other learners' cards.
    pub fn get_card(&self, card_id: &str, owner: &str) -> Result<CardRecord> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let sql = format!("{} WHERE c.id = ?1 AND c.owner = ?2", CARD_WITH_MASTERY_SELECT);
        let mut stmt = reader.prepare(&sql)?;

        stmt.query_row(params![card_id, owner], |row| Self::row_to_record(row))
            .optional()?
            .ok_or_else(|| StorageError::NotFound(card_id.to_string()))
    }

    /// Delete a card. Its mastery row and review log go with it.
    pub fn delete_card(&self, card_id: &str, owner: &str) -> Result<bool> {
        let writer = self.writer.lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let rows = writer.execute(
            "DELETE FROM cards WHERE id = ?1 AND owner = ?2",
            params![card_id, owner],
        )?;
        Ok(rows > 0)
    }

    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
        let created_at: String = row.get("created_at")?;
        Ok(Card {
            id: row.get("id")?,
            owner: row.get("owner")?,
            front: row.get("front")?,
            back: row.get("back")?,
            source_kind: row.get("source_kind")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
        })
    }

    /// Convert a `CARD_WITH_MASTERY_SELECT` row to a record
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<CardRecord> {
        let card = Self::row_to_card(row)?;
        let version: i64 = row.get("m_version")?;

        let mastery = if version == 0 {
            Mastery::initial(card.id.clone(), card.created_at)
        } else {
            let due_at: String = row.get("m_due_at")?;
            let last_reviewed_at: Option<String> = row.get("m_last_reviewed_at")?;
            Mastery {
                card_id: card.id.clone(),
                ease: row.get("m_ease")?,
                interval_days: row.get("m_interval_days")?,
                reps: row.get("m_reps")?,
                lapses: row.get("m_lapses")?,
                due_at: parse_timestamp(&due_at, "due_at")?,
                last_reviewed_at: last_reviewed_at
                    .map(|s| parse_timestamp(&s, "last_reviewed_at"))
                    .transpose()?,
            }
        };

        Ok(CardRecord { card, mastery, version })
    }

    // ========================================================================
    // MASTERY
    // ========================================================================

    /// Persist a mastery state if the stored version is still `expected_version`.
    ///
    /// Returns the new version, or `Conflict` when another writer got there
    /// first. `expected_version == 0` inserts the first row for the card.
    pub fn save_mastery(&self, mastery: &Mastery, expected_version: i64) -> Result<i64> {
        let writer = self.writer.lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        Self::write_mastery(&writer, mastery, expected_version)
    }

    fn write_mastery(conn: &Connection, mastery: &Mastery, expected_version: i64) -> Result<i64> {
        let now = format_timestamp(Utc::now());
        let due_at = format_timestamp(mastery.due_at);
        let last_reviewed_at = mastery.last_reviewed_at.map(format_timestamp);

        let changed = if expected_version == 0 {
            conn.execute(
                "INSERT INTO mastery (
                    card_id, ease, interval_days, reps, lapses,
                    due_at, last_reviewed_at, version, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)
                ON CONFLICT(card_id) DO NOTHING",
                params![
                    mastery.card_id,
                    mastery.ease,
                    mastery.interval_days,
                    mastery.reps,
                    mastery.lapses,
                    due_at,
                    last_reviewed_at,
                    now,
                ],
            )?
        } else {
            conn.execute(
                "UPDATE mastery SET
                    ease = ?1,
                    interval_days = ?2,
                    reps = ?3,
                    lapses = ?4,
                    due_at = ?5,
                    last_reviewed_at = ?6,
                    version = version + 1,
                    updated_at = ?7
                WHERE card_id = ?8 AND version = ?9",
                params![
                    mastery.ease,
                    mastery.interval_days,
                    mastery.reps,
                    mastery.lapses,
                    due_at,
                    last_reviewed_at,
                    now,
                    mastery.card_id,
                    expected_version,
                ],
            )?
        };

        if changed == 0 {
            return Err(StorageError::Conflict(format!(
                "mastery for card {} changed since version {}",
                mastery.card_id, expected_version
            )));
        }

        Ok(expected_version + 1)
    }

    /// Stored mastery rows for an owner's cards (read-only analytics view)
    pub fn list_mastery(&self, owner: &str) -> Result<Vec<Mastery>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let sql = format!(
            "{} WHERE c.owner = ?1 AND m.card_id IS NOT NULL ORDER BY m.due_at ASC, c.id ASC",
            CARD_WITH_MASTERY_SELECT
        );
        let mut stmt = reader.prepare(&sql)?;

        let rows = stmt.query_map(params![owner], |row| Self::row_to_record(row))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.mastery);
        }
        Ok(result)
    }

    /// Owner's cards whose effective due date is at or before `now`.
    ///
    /// Cards without a mastery row are due from `created_at`. Order is
    /// unspecified; the due queue applies its own ordering.
    pub fn due_candidates(&self, owner: &str, now: DateTime<Utc>) -> Result<Vec<CardWithMastery>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let sql = format!(
            "{} WHERE c.owner = ?1 AND COALESCE(m.due_at, c.created_at) <= ?2",
            CARD_WITH_MASTERY_SELECT
        );
        let mut stmt = reader.prepare(&sql)?;

        let rows = stmt.query_map(params![owner, format_timestamp(now)], |row| {
            Self::row_to_record(row)
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into());
        }
        Ok(result)
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    /// Persist one review atomically.
    ///
    /// In a single immediate transaction: reject or short-circuit a reused
    /// client review id, compare-and-set the mastery row, append to the
    /// review log. Nothing is written unless all three succeed.
    pub fn commit_review(&self, commit: &ReviewCommit<'_>) -> Result<CommitOutcome> {
        let mut writer = self.writer.lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(client_id) = commit.client_review_id {
            if let Some(existing) = Self::find_review_in(&tx, commit.owner, client_id)? {
                if existing.card_id != commit.after.card_id {
                    return Err(StorageError::ClientIdReused {
                        client_review_id: client_id.to_string(),
                        card_id: existing.card_id,
                    });
                }
                return Ok(CommitOutcome::Duplicate(existing));
            }
        }

        let version = Self::write_mastery(&tx, commit.after, commit.expected_version)?;

        let review = ReviewRecord {
            id: Uuid::new_v4().to_string(),
            owner: commit.owner.to_string(),
            card_id: commit.after.card_id.clone(),
            client_review_id: commit.client_review_id.map(str::to_string),
            quality: commit.quality,
            reviewed_at: commit.reviewed_at,
            ease_before: commit.before.ease,
            ease_after: commit.after.ease,
            interval_before: commit.before.interval_days,
            interval_after: commit.after.interval_days,
            reps_after: commit.after.reps,
            lapses_after: commit.after.lapses,
            due_at_after: commit.after.due_at,
        };

        tx.execute(
            "INSERT INTO reviews (
                id, owner, card_id, client_review_id, quality, reviewed_at,
                ease_before, ease_after, interval_before, interval_after,
                reps_after, lapses_after, due_at_after
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                review.id,
                review.owner,
                review.card_id,
                review.client_review_id,
                review.quality.as_i64(),
                format_timestamp(review.reviewed_at),
                review.ease_before,
                review.ease_after,
                review.interval_before,
                review.interval_after,
                review.reps_after,
                review.lapses_after,
                format_timestamp(review.due_at_after),
            ],
        )?;

        tx.commit()?;
        Ok(CommitOutcome::Applied { review, version })
    }

    /// Look up an applied review by its client-supplied id
    pub fn find_review(&self, owner: &str, client_review_id: &str) -> Result<Option<ReviewRecord>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        Self::find_review_in(&reader, owner, client_review_id)
    }

    fn find_review_in(
        conn: &Connection,
        owner: &str,
        client_review_id: &str,
    ) -> Result<Option<ReviewRecord>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM reviews WHERE owner = ?1 AND client_review_id = ?2",
        )?;
        let review = stmt
            .query_row(params![owner, client_review_id], |row| Self::row_to_review(row))
            .optional()?;
        Ok(review)
    }

    /// Review log for one card, oldest first
    pub fn reviews_for_card(&self, card_id: &str, owner: &str) -> Result<Vec<ReviewRecord>> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT * FROM reviews
             WHERE card_id = ?1 AND owner = ?2
             ORDER BY reviewed_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![card_id, owner], |row| Self::row_to_review(row))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn row_to_review(row: &rusqlite::Row) -> rusqlite::Result<ReviewRecord> {
        let reviewed_at: String = row.get("reviewed_at")?;
        let due_at_after: String = row.get("due_at_after")?;
        Ok(ReviewRecord {
            id: row.get("id")?,
            owner: row.get("owner")?,
            card_id: row.get("card_id")?,
            client_review_id: row.get("client_review_id")?,
            quality: parse_quality(row.get("quality")?)?,
            reviewed_at: parse_timestamp(&reviewed_at, "reviewed_at")?,
            ease_before: row.get("ease_before")?,
            ease_after: row.get("ease_after")?,
            interval_before: row.get("interval_before")?,
            interval_after: row.get("interval_after")?,
            reps_after: row.get("reps_after")?,
            lapses_after: row.get("lapses_after")?,
            due_at_after: parse_timestamp(&due_at_after, "due_at_after")?,
        })
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Collection statistics for one owner at `now`
    pub fn stats(&self, owner: &str, now: DateTime<Utc>) -> Result<ReviewStats> {
        let reader = self.reader.lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let (total_cards, unseen_cards, new_cards, due_now, total_lapses, average_ease) = reader
            .query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN m.card_id IS NULL THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN COALESCE(m.reps, 0) = 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN COALESCE(m.due_at, c.created_at) <= ?2 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(COALESCE(m.lapses, 0)), 0),
                    AVG(m.ease)
                 FROM cards c
                 LEFT JOIN mastery m ON m.card_id = c.id
                 WHERE c.owner = ?1",
                params![owner, format_timestamp(now)],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                    ))
                },
            )?;

        let total_reviews: i64 = reader.query_row(
            "SELECT COUNT(*) FROM reviews WHERE owner = ?1",
            params![owner],
            |row| row.get(0),
        )?;

        Ok(ReviewStats {
            total_cards,
            unseen_cards,
            new_cards,
            mature_cards: total_cards - new_cards,
            due_now,
            total_reviews,
            total_lapses,
            average_ease,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
