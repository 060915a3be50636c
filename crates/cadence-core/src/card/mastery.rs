//! Mastery - per-card scheduling state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduling::DEFAULT_EASE;

/// Scheduling state attached to one card
///
/// A card without a stored row behaves exactly like [`Mastery::initial`],
/// so callers never have to handle a missing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mastery {
    /// Card this state belongs to
    pub card_id: String,
    /// Difficulty multiplier, within `[1.3, 3.0]`
    pub ease: f64,
    /// Days between `last_reviewed_at` and `due_at`
    pub interval_days: i64,
    /// Consecutive successful reviews since the last lapse
    pub reps: i64,
    /// Total Again ratings ever recorded; never decreases
    pub lapses: i64,
    /// When the card next becomes eligible for review
    pub due_at: DateTime<Utc>,
    /// When the card was last reviewed, if ever
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl Mastery {
    /// Default state for a card that has never been reviewed.
    ///
    /// The card is due as soon as it exists.
    pub fn initial(card_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            card_id: card_id.into(),
            ease: DEFAULT_EASE,
            interval_days: 0,
            reps: 0,
            lapses: 0,
            due_at: created_at,
            last_reviewed_at: None,
        }
    }

    /// Never successfully reviewed (or reset by a lapse)
    pub fn is_new(&self) -> bool {
        self.reps == 0
    }

    /// Eligible for review at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}
