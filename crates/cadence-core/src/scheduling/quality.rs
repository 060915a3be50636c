//! Review quality ratings

use serde::{Deserialize, Serialize};

/// Learner's self-assessment of recall for one review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Quality {
    /// Forgot the card (a lapse)
    Again = 1,
    /// Recalled with serious difficulty
    Hard = 2,
    /// Recalled after some hesitation
    Good = 3,
    /// Recalled instantly
    Easy = 4,
}

/// Rejected quality value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Quality must be between 1 and 4, got {0}")]
pub struct InvalidQuality(pub i64);

impl Quality {
    /// All ratings, in ascending order
    pub const ALL: [Quality; 4] = [Quality::Again, Quality::Hard, Quality::Good, Quality::Easy];

    /// Parse a wire value, returning `None` outside `1..=4`
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Quality::Again),
            2 => Some(Quality::Hard),
            3 => Some(Quality::Good),
            4 => Some(Quality::Easy),
            _ => None,
        }
    }

    /// Numeric wire value
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Display name
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Again => "again",
            Quality::Hard => "hard",
            Quality::Good => "good",
            Quality::Easy => "easy",
        }
    }

    /// Whether this rating counts as a successful recall
    pub fn is_success(self) -> bool {
        self != Quality::Again
    }
}

impl TryFrom<i64> for Quality {
    type Error = InvalidQuality;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_i64(value).ok_or(InvalidQuality(value))
    }
}

impl From<Quality> for i64 {
    fn from(quality: Quality) -> Self {
        quality.as_i64()
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "again" => Ok(Quality::Again),
            "2" | "hard" => Ok(Quality::Hard),
            "3" | "good" => Ok(Quality::Good),
            "4" | "easy" => Ok(Quality::Easy),
            _ => Err(format!("Unknown quality: {}", s)),
        }
    }
}
