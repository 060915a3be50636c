//! Storage Module
//!
//! SQLite-based card store with:
//! - Lazy mastery rows (absent row = default state)
//! - Optimistic versioning on every mastery write
//! - Review log with per-owner client review ids

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{
    format_timestamp, normalize_timestamp, CardRecord, CommitOutcome, Result, ReviewCommit,
    ReviewRecord, ReviewStats, Storage, StorageError,
};
