//! Spaced-Repetition Scheduling Module
//!
//! Ease-factor scheduling in the SM-2 family, tuned to the review labels
//! learners see: Again <1d, Hard 1-3d, Good 3-7d, Easy 7d+.
//!
//! ## Core rules:
//! - First success graduates a card to a fixed interval (Hard 1d, Good 3d, Easy 7d)
//! - Mature intervals grow by `ease` (Good), `1.2` (Hard), or `ease * 1.3` (Easy)
//! - Again resets the streak, counts a lapse, and makes the card due immediately
//! - Ease stays within `[1.3, 3.0]`, intervals within `[0, 3650]` days

mod algorithm;
mod quality;
mod scheduler;

pub use algorithm::{
    clamp_ease, clamp_interval, due_after, scale_interval,
    // Constants
    AGAIN_EASE_PENALTY, DEFAULT_EASE, EASY_EASE_BONUS, EASY_INTERVAL_BONUS,
    GRADUATING_EASY_DAYS, GRADUATING_GOOD_DAYS, GRADUATING_HARD_DAYS, HARD_EASE_PENALTY,
    HARD_INTERVAL_FACTOR, MAX_EASE, MAX_INTERVAL_DAYS, MIN_EASE,
};

pub use quality::{InvalidQuality, Quality};
pub use scheduler::{PreviewResults, Scheduler};
