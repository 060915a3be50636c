//! # Card Lifecycle Tests
//!
//! Creation defaults, ownership boundaries, cascade on deletion, and
//! persistence across reopening the same database file.

use cadence_core::{NewCard, ReviewError, ReviewSubmission, StorageError};
use cadence_e2e_tests::{TestDataFactory, TestDatabaseManager};
use chrono::Duration;
use tempfile::TempDir;

#[test]
fn test_creation_defaults() {
    let db = TestDatabaseManager::new_temp();
    let t0 = TestDataFactory::base_time();

    let card = db
        .storage
        .create_card(NewCard::new("owner-a", "  Front  ", " Back "), t0)
        .unwrap();
    assert_eq!(card.source_kind, "direct");
    assert_eq!(card.front, "Front");
    assert_eq!(card.back, "Back");

    let record = db.storage.get_card(&card.id, "owner-a").unwrap();
    assert!(!record.has_stored_mastery());
    assert_eq!(record.mastery.due_at, t0);

    let lecture = db
        .storage
        .create_card(NewCard::new("owner-a", "Q", "A").with_source_kind("lecture"), t0)
        .unwrap();
    assert_eq!(lecture.source_kind, "lecture");

    let err = db
        .storage
        .create_card(NewCard::new("owner-a", "Q", ""), t0)
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));
}

#[test]
fn test_other_owners_cannot_touch_cards() {
    let db = TestDatabaseManager::new_temp();
    let service = db.review_service();
    let card = TestDataFactory::create_card(&db.storage, "owner-a", "Private").unwrap();
    let t0 = TestDataFactory::base_time();

    let err = service
        .submit_review("owner-b", &ReviewSubmission::new(&card.id, 4), t0)
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotFound(_)));
    assert!(matches!(service.preview("owner-b", &card.id, t0), Err(ReviewError::NotFound(_))));
    assert!(matches!(service.history("owner-b", &card.id), Err(ReviewError::NotFound(_))));
    assert!(!db.storage.delete_card(&card.id, "owner-b").unwrap());
    assert!(db.storage.list_mastery("owner-b").unwrap().is_empty());

    assert_eq!(db.storage.get_card(&card.id, "owner-a").unwrap().version, 0);
}

#[test]
fn test_delete_cascades_mastery_and_log() {
    let db = TestDatabaseManager::new_temp();
    let service = db.review_service();
    let ids = db.seed_with_review_states("owner-a", TestDataFactory::base_time());
    let learned = &ids[1];

    assert_eq!(db.storage.list_mastery("owner-a").unwrap().len(), 2);
    assert_eq!(service.history("owner-a", learned).unwrap().len(), 3);

    assert!(db.storage.delete_card(learned, "owner-a").unwrap());

    assert!(matches!(
        db.storage.get_card(learned, "owner-a"),
        Err(StorageError::NotFound(_))
    ));
    assert!(db.storage.reviews_for_card(learned, "owner-a").unwrap().is_empty());
    let remaining = db.storage.list_mastery("owner-a").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_ne!(&remaining[0].card_id, learned);

    let stats = db.storage.stats("owner-a", TestDataFactory::base_time() + Duration::days(1)).unwrap();
    assert_eq!(stats.total_cards, 2);
    assert_eq!(stats.total_reviews, 3);
}

#[test]
fn test_clearing_one_owner_leaves_others() {
    let db = TestDatabaseManager::new_temp();
    let t0 = TestDataFactory::base_time();
    let a_ids = db.seed_with_review_states("owner-a", t0);
    let b_ids = db.seed_with_review_states("owner-b", t0);

    db.clear("owner-a");

    assert!(db.is_empty("owner-a"));
    assert!(db.storage.list_mastery("owner-a").unwrap().is_empty());
    for id in &a_ids {
        assert!(db.storage.reviews_for_card(id, "owner-a").unwrap().is_empty());
    }

    assert_eq!(db.card_count("owner-b"), 3);
    assert_eq!(db.storage.list_mastery("owner-b").unwrap().len(), 2);
    assert_eq!(db.storage.reviews_for_card(&b_ids[1], "owner-b").unwrap().len(), 3);
}

#[test]
fn test_state_survives_reopen_at_same_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lifecycle.db");
    let t0 = TestDataFactory::base_time();

    let (learned_id, before) = {
        let db = TestDatabaseManager::new_at_path(path.clone());
        let ids = db.seed_with_review_states("owner-a", t0);
        let record = db.storage.get_card(&ids[1], "owner-a").unwrap();
        (ids[1].clone(), record)
    };

    let db = TestDatabaseManager::new_at_path(path.clone());
    assert_eq!(db.path(), &path);
    assert_eq!(db.card_count("owner-a"), 3);

    let after = db.storage.get_card(&learned_id, "owner-a").unwrap();
    assert_eq!(after.mastery, before.mastery);
    assert_eq!(after.version, before.version);
    assert_eq!(db.review_service().history("owner-a", &learned_id).unwrap().len(), 3);
}
