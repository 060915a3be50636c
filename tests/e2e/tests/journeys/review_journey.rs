//! # Review Journey Tests
//!
//! A learner takes one card from creation to maturity, lapses, and relearns
//! it. Every step goes through the review service and is checked against
//! the stored state.

use cadence_core::{Quality, ReviewSubmission};
use cadence_e2e_tests::{TestDataFactory, TestDatabaseManager};
use chrono::Duration;

const OWNER: &str = "learner-1";

#[test]
fn test_card_from_creation_to_maturity() {
    let db = TestDatabaseManager::new_temp();
    let service = db.review_service();
    let card = TestDataFactory::create_card(&db.storage, OWNER, "Powerhouse of the cell?").unwrap();
    let t0 = TestDataFactory::base_time();

    // Unseen card is due at creation with the default state
    let due = db.due_queue().due_cards(OWNER, t0, None, None).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].mastery.ease, 2.5);
    assert!(due[0].mastery.is_new());

    // Good graduates to 3 days
    let first = service
        .submit_review(OWNER, &ReviewSubmission::new(&card.id, 3), t0)
        .unwrap();
    assert_eq!(first.mastery.interval_days, 3);
    assert_eq!(first.mastery.due_at, t0 + Duration::days(3));

    // Reviewed on time, Good grows by ease: 3 * 2.5 = 7.5 -> 8
    let t1 = first.mastery.due_at;
    let second = service
        .submit_review(OWNER, &ReviewSubmission::new(&card.id, 3), t1)
        .unwrap();
    assert_eq!(second.mastery.interval_days, 8);
    assert_eq!(second.mastery.reps, 2);

    // Easy uses the incoming ease: 8 * 2.5 * 1.3 = 26
    let t2 = second.mastery.due_at;
    let third = service
        .submit_review(OWNER, &ReviewSubmission::new(&card.id, 4), t2)
        .unwrap();
    assert_eq!(third.mastery.interval_days, 26);
    assert!((third.mastery.ease - 2.65).abs() < 1e-9);
    assert_eq!(third.mastery.due_at, t2 + Duration::days(26));

    // Not due in between
    assert!(db
        .due_queue()
        .due_cards(OWNER, t2 + Duration::days(25), None, None)
        .unwrap()
        .is_empty());

    let history = service.history(OWNER, &card.id).unwrap();
    let ratings: Vec<Quality> = history.iter().map(|r| r.quality).collect();
    assert_eq!(ratings, vec![Quality::Good, Quality::Good, Quality::Easy]);
}

#[test]
fn test_lapse_and_relearn() {
    let db = TestDatabaseManager::new_temp();
    let service = db.review_service();
    let card = TestDataFactory::create_card(&db.storage, OWNER, "Krebs cycle output?").unwrap();
    db.review_at_due(&service, OWNER, &card.id, &[Quality::Good, Quality::Good]);

    let before = db.storage.get_card(&card.id, OWNER).unwrap().mastery;
    assert_eq!(before.reps, 2);

    // Forgotten: due immediately, streak reset, ease drops
    let lapse_time = before.due_at + Duration::days(2);
    let lapsed = service
        .submit_review(OWNER, &ReviewSubmission::new(&card.id, 1), lapse_time)
        .unwrap();
    assert_eq!(lapsed.mastery.reps, 0);
    assert_eq!(lapsed.mastery.lapses, 1);
    assert_eq!(lapsed.mastery.interval_days, 0);
    assert_eq!(lapsed.mastery.due_at, lapse_time);
    assert!((lapsed.mastery.ease - 2.3).abs() < 1e-9);

    let due = db.due_queue().due_cards(OWNER, lapse_time, None, None).unwrap();
    assert_eq!(due.len(), 1);

    // Relearning graduates again from the fixed intervals
    let relearned = service
        .submit_review(OWNER, &ReviewSubmission::new(&card.id, 2), lapse_time + Duration::minutes(10))
        .unwrap();
    assert_eq!(relearned.mastery.reps, 1);
    assert_eq!(relearned.mastery.interval_days, 1);
    assert_eq!(relearned.mastery.lapses, 1);
    assert!((relearned.mastery.ease - 2.15).abs() < 1e-9);
}

#[test]
fn test_long_history_keeps_invariants() {
    let db = TestDatabaseManager::new_temp();
    let service = db.review_service();
    let card = TestDataFactory::create_card(&db.storage, OWNER, "Stress card").unwrap();

    let pattern = [Quality::Good, Quality::Easy, Quality::Hard, Quality::Again, Quality::Easy];
    let mut previous_lapses = 0;
    for round in 0..40 {
        let quality = pattern[round % pattern.len()];
        db.review_at_due(&service, OWNER, &card.id, &[quality]);

        let m = db.storage.get_card(&card.id, OWNER).unwrap().mastery;
        assert!((1.3..=3.0).contains(&m.ease), "ease out of range: {}", m.ease);
        assert!((0..=3650).contains(&m.interval_days));
        assert!(m.lapses >= previous_lapses);
        let reviewed = m.last_reviewed_at.unwrap();
        assert_eq!(m.due_at, reviewed + Duration::days(m.interval_days));
        previous_lapses = m.lapses;
    }

    assert_eq!(service.history(OWNER, &card.id).unwrap().len(), 40);
}

#[test]
fn test_state_survives_reopen() {
    let db = TestDatabaseManager::new_temp();
    let service = db.review_service();
    let card = TestDataFactory::create_card(&db.storage, OWNER, "Persistent?").unwrap();
    let outcome = service
        .submit_review(OWNER, &ReviewSubmission::new(&card.id, 4), TestDataFactory::base_time())
        .unwrap();

    let reopened = db.reopen();
    let record = reopened.get_card(&card.id, OWNER).unwrap();
    assert_eq!(record.mastery, outcome.mastery);
    assert_eq!(record.version, 1);
}
