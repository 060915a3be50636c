//! Ease/interval arithmetic
//!
//! Every helper here is pure and total. Inputs outside the declared domain
//! are clamped rather than rejected, so the scheduler can never fail on a
//! row that was written by an older version or edited by hand.

use chrono::{DateTime, Duration, Utc};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Ease assigned to a card that has never been reviewed
pub const DEFAULT_EASE: f64 = 2.5;

/// Lower bound for ease
pub const MIN_EASE: f64 = 1.3;

/// Upper bound for ease
pub const MAX_EASE: f64 = 3.0;

/// Upper bound for interval growth (ten years)
pub const MAX_INTERVAL_DAYS: i64 = 3650;

/// Ease penalty for an Again rating
pub const AGAIN_EASE_PENALTY: f64 = 0.20;

/// Ease penalty for a Hard rating
pub const HARD_EASE_PENALTY: f64 = 0.15;

/// Ease bonus for an Easy rating
pub const EASY_EASE_BONUS: f64 = 0.15;

/// Interval multiplier for Hard on a mature card
pub const HARD_INTERVAL_FACTOR: f64 = 1.20;

/// Extra interval multiplier for Easy on a mature card (applied on top of ease)
pub const EASY_INTERVAL_BONUS: f64 = 1.30;

/// Graduating interval for a first Hard
pub const GRADUATING_HARD_DAYS: i64 = 1;

/// Graduating interval for a first Good
pub const GRADUATING_GOOD_DAYS: i64 = 3;

/// Graduating interval for a first Easy
pub const GRADUATING_EASY_DAYS: i64 = 7;

// ============================================================================
// HELPERS
// ============================================================================

/// Bring an ease value into `[MIN_EASE, MAX_EASE]`.
///
/// Non-finite values fall back to [`DEFAULT_EASE`]. The result is kept at
/// two-decimal precision so long review histories do not accumulate
/// floating point drift.
pub fn clamp_ease(ease: f64) -> f64 {
    if !ease.is_finite() {
        return DEFAULT_EASE;
    }
    let rounded = (ease * 100.0).round() / 100.0;
    rounded.clamp(MIN_EASE, MAX_EASE)
}

/// Bring an interval into `[0, MAX_INTERVAL_DAYS]`.
pub fn clamp_interval(days: i64) -> i64 {
    days.clamp(0, MAX_INTERVAL_DAYS)
}

/// Scale a mature interval by `factor`, rounding half away from zero.
///
/// Successful reviews never schedule less than one day out, and growth is
/// capped at [`MAX_INTERVAL_DAYS`].
pub fn scale_interval(interval_days: i64, factor: f64) -> i64 {
    let scaled = (interval_days.max(0) as f64 * factor).round();
    // `as` saturates on overflow and maps NaN to 0, both handled by the clamp
    (scaled as i64).clamp(1, MAX_INTERVAL_DAYS)
}

/// Due date for an interval measured from `now`.
pub fn due_after(now: DateTime<Utc>, interval_days: i64) -> DateTime<Utc> {
    if interval_days <= 0 {
        now
    } else {
        now + Duration::days(interval_days)
    }
}

// ============================================================================
// TESTS
// ============================================================================
