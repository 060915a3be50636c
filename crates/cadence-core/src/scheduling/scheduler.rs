//! Review scheduler
//!
//! Maps (current mastery, quality, now) to the next mastery state. The
//! scheduler holds no state and never reads a clock; the same inputs always
//! produce the same output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{
    clamp_ease, clamp_interval, due_after, scale_interval, AGAIN_EASE_PENALTY,
    EASY_EASE_BONUS, EASY_INTERVAL_BONUS, GRADUATING_EASY_DAYS, GRADUATING_GOOD_DAYS,
    GRADUATING_HARD_DAYS, HARD_EASE_PENALTY, HARD_INTERVAL_FACTOR,
};
use super::quality::Quality;
use crate::card::Mastery;

/// Resulting state for every possible rating of one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResults {
    pub again: Mastery,
    pub hard: Mastery,
    pub good: Mastery,
    pub easy: Mastery,
}

impl PreviewResults {
    /// Outcome for a single rating
    pub fn get(&self, quality: Quality) -> &Mastery {
        match quality {
            Quality::Again => &self.again,
            Quality::Hard => &self.hard,
            Quality::Good => &self.good,
            Quality::Easy => &self.easy,
        }
    }
}

/// Stateless ease/interval scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scheduler;

impl Scheduler {
    pub fn new() -> Self {
        Self
    }

    /// Apply one review to `mastery`.
    ///
    /// A card with `reps == 0` graduates on its first successful review to a
    /// fixed interval per rating; a mature card grows its interval
    /// multiplicatively. Again always resets the streak, counts a lapse,
    /// and makes the card due at `now`.
    pub fn schedule(&self, mastery: &Mastery, quality: Quality, now: DateTime<Utc>) -> Mastery {
        let ease = clamp_ease(mastery.ease);
        let interval = clamp_interval(mastery.interval_days);
        let reps = mastery.reps.max(0);
        let lapses = mastery.lapses.max(0);

        let (ease, interval_days, reps, lapses) = match quality {
            Quality::Again => (
                clamp_ease(ease - AGAIN_EASE_PENALTY),
                0,
                0,
                lapses.saturating_add(1),
            ),
            Quality::Hard if reps == 0 => (
                clamp_ease(ease - HARD_EASE_PENALTY),
                GRADUATING_HARD_DAYS,
                1,
                lapses,
            ),
            Quality::Good if reps == 0 => (ease, GRADUATING_GOOD_DAYS, 1, lapses),
            Quality::Easy if reps == 0 => (
                clamp_ease(ease + EASY_EASE_BONUS),
                GRADUATING_EASY_DAYS,
                1,
                lapses,
            ),
            Quality::Hard => (
                clamp_ease(ease - HARD_EASE_PENALTY),
                scale_interval(interval, HARD_INTERVAL_FACTOR),
                reps.saturating_add(1),
                lapses,
            ),
            Quality::Good => (
                ease,
                scale_interval(interval, ease),
                reps.saturating_add(1),
                lapses,
            ),
            // Growth uses the ease entering the review, the bonus applies afterwards
            Quality::Easy => (
                clamp_ease(ease + EASY_EASE_BONUS),
                scale_interval(interval, ease * EASY_INTERVAL_BONUS),
                reps.saturating_add(1),
                lapses,
            ),
        };

        let interval_days = clamp_interval(interval_days);

        Mastery {
            card_id: mastery.card_id.clone(),
            ease,
            interval_days,
            reps,
            lapses,
            due_at: due_after(now, interval_days),
            last_reviewed_at: Some(now),
        }
    }

    /// Outcome of each rating without committing to any of them
    pub fn preview(&self, mastery: &Mastery, now: DateTime<Utc>) -> PreviewResults {
        PreviewResults {
            again: self.schedule(mastery, Quality::Again, now),
            hard: self.schedule(mastery, Quality::Hard, now),
            good: self.schedule(mastery, Quality::Good, now),
            easy: self.schedule(mastery, Quality::Easy, now),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
