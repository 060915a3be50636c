//! Test Database Manager
//!
//! Provides isolated card stores for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded databases with cards in known review states
//! - Reopening the same file to check persistence
//! - Services wired to the managed store

use cadence_core::{
    DueQueue, NewCard, Quality, ReviewService, ReviewSubmission, Storage,
};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let ids = db.seed_cards("alice", 10, TestDataFactory::base_time());
/// let due = db.due_queue().due_cards("alice", now, None, None)?;
/// ```
pub struct TestDatabaseManager {
    /// The storage instance
    pub storage: Arc<Storage>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_cadence.db");

        let storage = Storage::new(Some(db_path.clone())).expect("Failed to create test storage");

        Self {
            storage: Arc::new(storage),
            _temp_dir: Some(temp_dir),
            db_path,
        }
    }

    /// Create a test database at a specific path
    ///
    /// The database is NOT automatically deleted.
    pub fn new_at_path(path: PathBuf) -> Self {
        let storage = Storage::new(Some(path.clone())).expect("Failed to create test storage");

        Self {
            storage: Arc::new(storage),
            _temp_dir: None,
            db_path: path,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Check if the owner has no cards
    pub fn is_empty(&self, owner: &str) -> bool {
        self.card_count(owner) == 0
    }

    /// Get the number of cards an owner has
    pub fn card_count(&self, owner: &str) -> i64 {
        self.storage
            .stats(owner, Utc::now())
            .map(|s| s.total_cards)
            .unwrap_or(0)
    }

    /// Review service over the managed store, with no conflict retries
    pub fn review_service(&self) -> ReviewService {
        ReviewService::new(Arc::clone(&self.storage))
    }

    /// Due queue over the managed store with default sizing
    pub fn due_queue(&self) -> DueQueue {
        DueQueue::new(Arc::clone(&self.storage))
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Seed `count` cards, created one minute apart from `start`
    pub fn seed_cards(&self, owner: &str, count: usize, start: DateTime<Utc>) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);

        for i in 0..count {
            let input = NewCard::new(owner, format!("Question {}", i), format!("Answer {}", i));
            if let Ok(card) = self.storage.create_card(input, start + Duration::minutes(i as i64)) {
                ids.push(card.id);
            }
        }

        ids
    }

    /// Seed three cards in distinct review states, all created at `start`
    ///
    /// Returns `[new, well_learned, struggling]`. Reviews are applied at
    /// each card's due date, so intervals grow the way a real learner's would.
    pub fn seed_with_review_states(&self, owner: &str, start: DateTime<Utc>) -> Vec<String> {
        let service = self.review_service();
        let mut ids = Vec::new();

        // New card (never reviewed)
        if let Ok(card) = self
            .storage
            .create_card(NewCard::new(owner, "New card", "never reviewed"), start)
        {
            ids.push(card.id);
        }

        // Well-learned card (multiple good reviews)
        if let Ok(card) = self
            .storage
            .create_card(NewCard::new(owner, "Well-learned card", "reviewed often"), start)
        {
            self.review_at_due(&service, owner, &card.id, &[Quality::Good, Quality::Good, Quality::Easy]);
            ids.push(card.id);
        }

        // Struggling card (multiple lapses)
        if let Ok(card) = self
            .storage
            .create_card(NewCard::new(owner, "Struggling card", "keeps lapsing"), start)
        {
            self.review_at_due(&service, owner, &card.id, &[Quality::Again, Quality::Hard, Quality::Again]);
            ids.push(card.id);
        }

        ids
    }

    /// Apply `qualities` in order, each at the card's current due date
    pub fn review_at_due(
        &self,
        service: &ReviewService,
        owner: &str,
        card_id: &str,
        qualities: &[Quality],
    ) {
        for quality in qualities {
            let Ok(record) = self.storage.get_card(card_id, owner) else {
                return;
            };
            let _ = service.submit_review(
                owner,
                &ReviewSubmission::new(card_id, quality.as_i64()),
                record.mastery.due_at,
            );
        }
    }

    // ========================================================================
    // CLEANUP
    // ========================================================================

    /// Delete every card an owner has (mastery and review log cascade)
    pub fn clear(&self, owner: &str) {
        let far_future = Utc::now() + Duration::days(365 * 100);
        if let Ok(cards) = self.storage.due_candidates(owner, far_future) {
            for entry in cards {
                let _ = self.storage.delete_card(&entry.card.id, owner);
            }
        }
    }

    /// Open a second store on the same file
    pub fn reopen(&self) -> Storage {
        Storage::new(Some(self.db_path.clone())).expect("Failed to reopen storage")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_temp_database_creation() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.is_empty("alice"));
        assert!(db.path().exists());
    }

    #[test]
    fn test_seed_cards() {
        let db = TestDatabaseManager::new_temp();
        let ids = db.seed_cards("alice", 10, start());

        assert_eq!(ids.len(), 10);
        assert_eq!(db.card_count("alice"), 10);
        assert!(db.is_empty("bob"));
    }

    #[test]
    fn test_seed_with_review_states() {
        let db = TestDatabaseManager::new_temp();
        let ids = db.seed_with_review_states("alice", start());
        assert_eq!(ids.len(), 3);

        let new = db.storage.get_card(&ids[0], "alice").unwrap();
        assert_eq!(new.version, 0);

        let learned = db.storage.get_card(&ids[1], "alice").unwrap();
        assert_eq!(learned.mastery.reps, 3);
        assert_eq!(learned.mastery.lapses, 0);

        let struggling = db.storage.get_card(&ids[2], "alice").unwrap();
        assert_eq!(struggling.mastery.lapses, 2);
        assert_eq!(struggling.mastery.reps, 0);
    }

    #[test]
    fn test_clear_database() {
        let db = TestDatabaseManager::new_temp();
        db.seed_cards("alice", 5, start());
        db.seed_cards("bob", 2, start());

        db.clear("alice");
        assert!(db.is_empty("alice"));
        assert_eq!(db.card_count("bob"), 2);
    }
}
