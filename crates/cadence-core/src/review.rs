//! Review Service
//!
//! Orchestrates one review: validate the rating, load the card's state,
//! schedule, commit. The only write path for mastery rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::Mastery;
use crate::scheduling::{PreviewResults, Quality, Scheduler};
use crate::storage::{normalize_timestamp, CommitOutcome, ReviewCommit, ReviewRecord, Storage, StorageError};

// ============================================================================
// ERRORS
// ============================================================================

/// Review submission error
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Rating outside 1..=4; nothing was written
    #[error("Invalid quality rating: {0} (expected 1-4)")]
    InvalidQuality(i64),
    /// Card missing or not owned by the caller
    #[error("Card not found: {0}")]
    NotFound(String),
    /// No caller identity
    #[error("Forbidden")]
    Forbidden,
    /// Lost a concurrent update
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Client review id already applied to a different card
    #[error("Client review id {client_review_id} already used for card {card_id}")]
    ClientIdReused {
        client_review_id: String,
        card_id: String,
    },
    /// Persistence failure; nothing was written
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ReviewError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => ReviewError::NotFound(id),
            StorageError::Conflict(msg) => ReviewError::Conflict(msg),
            StorageError::ClientIdReused {
                client_review_id,
                card_id,
            } => ReviewError::ClientIdReused {
                client_review_id,
                card_id,
            },
            other => ReviewError::Storage(other),
        }
    }
}

impl ReviewError {
    /// Whether the caller may resubmit and expect a different result
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::Conflict(_))
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// A learner's rating of one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub card_id: String,
    /// Raw rating; validated against 1..=4
    pub quality: i64,
    /// Caller-generated id making the submission idempotent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_review_id: Option<String>,
}

impl ReviewSubmission {
    pub fn new(card_id: impl Into<String>, quality: i64) -> Self {
        Self {
            card_id: card_id.into(),
            quality,
            client_review_id: None,
        }
    }

    pub fn with_client_review_id(mut self, id: impl Into<String>) -> Self {
        self.client_review_id = Some(id.into());
        self
    }

    fn client_review_id(&self) -> Option<&str> {
        self.client_review_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    /// State after the review
    pub mastery: Mastery,
    /// Log entry for the review
    pub review: ReviewRecord,
    /// True when the client review id had already been applied
    pub duplicate: bool,
}

impl ReviewOutcome {
    fn applied(review: ReviewRecord) -> Self {
        Self {
            mastery: review.mastery_after(),
            review,
            duplicate: false,
        }
    }

    fn duplicate(review: ReviewRecord) -> Self {
        Self {
            mastery: review.mastery_after(),
            review,
            duplicate: true,
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Applies reviews through the scheduler and the card store
pub struct ReviewService {
    storage: Arc<Storage>,
    scheduler: Scheduler,
    conflict_retries: u32,
}

impl ReviewService {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            scheduler: Scheduler::new(),
            conflict_retries: 0,
        }
    }

    /// Retry the whole submission up to `retries` times on a version conflict
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    pub fn conflict_retries(&self) -> u32 {
        self.conflict_retries
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Apply one rating to a card.
    ///
    /// Exactly one mastery row changes when this returns a non-duplicate
    /// outcome; on any error nothing changes.
    pub fn submit_review(
        &self,
        owner: &str,
        submission: &ReviewSubmission,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, ReviewError> {
        if owner.trim().is_empty() {
            return Err(ReviewError::Forbidden);
        }
        let quality =
            Quality::try_from(submission.quality).map_err(|e| ReviewError::InvalidQuality(e.0))?;
        let client_review_id = submission.client_review_id();
        // Stored timestamps carry microseconds; keep the returned state identical
        let now = normalize_timestamp(now);

        let mut attempt = 0;
        loop {
            match self.try_submit(owner, &submission.card_id, quality, client_review_id, now) {
                Err(ReviewError::Conflict(msg)) if attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(
                        card_id = %submission.card_id,
                        attempt,
                        "Review conflict, retrying: {}",
                        msg
                    );
                }
                result => return result,
            }
        }
    }

    fn try_submit(
        &self,
        owner: &str,
        card_id: &str,
        quality: Quality,
        client_review_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, ReviewError> {
        let record = self.storage.get_card(card_id, owner)?;

        if let Some(client_id) = client_review_id {
            if let Some(existing) = self.storage.find_review(owner, client_id)? {
                return Self::replay(existing, card_id, client_id);
            }
        }

        let next = self.scheduler.schedule(&record.mastery, quality, now);
        let commit = ReviewCommit {
            owner,
            client_review_id,
            quality,
            reviewed_at: now,
            before: &record.mastery,
            after: &next,
            expected_version: record.version,
        };

        match self.storage.commit_review(&commit)? {
            CommitOutcome::Applied { review, version } => {
                tracing::info!(
                    card_id,
                    quality = quality.as_str(),
                    interval_days = next.interval_days,
                    reps = next.reps,
                    lapses = next.lapses,
                    version,
                    "Review applied"
                );
                Ok(ReviewOutcome::applied(review))
            }
            // Lost the race to an identical submission between lookup and commit
            CommitOutcome::Duplicate(existing) => {
                tracing::warn!(card_id, "Duplicate review submission ignored");
                Ok(ReviewOutcome::duplicate(existing))
            }
        }
    }

    fn replay(existing: ReviewRecord, card_id: &str, client_id: &str) -> Result<ReviewOutcome, ReviewError> {
        if existing.card_id != card_id {
            return Err(ReviewError::ClientIdReused {
                client_review_id: client_id.to_string(),
                card_id: existing.card_id,
            });
        }
        tracing::warn!(card_id, client_review_id = client_id, "Duplicate review submission ignored");
        Ok(ReviewOutcome::duplicate(existing))
    }

    /// Outcome of each rating for a card, without writing anything
    pub fn preview(
        &self,
        owner: &str,
        card_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PreviewResults, ReviewError> {
        if owner.trim().is_empty() {
            return Err(ReviewError::Forbidden);
        }
        let record = self.storage.get_card(card_id, owner)?;
        Ok(self.scheduler.preview(&record.mastery, normalize_timestamp(now)))
    }

    /// Review log for a card, oldest first
    pub fn history(&self, owner: &str, card_id: &str) -> Result<Vec<ReviewRecord>, ReviewError> {
        if owner.trim().is_empty() {
            return Err(ReviewError::Forbidden);
        }
        // Distinguish "no reviews" from "no such card"
        self.storage.get_card(card_id, owner)?;
        Ok(self.storage.reviews_for_card(card_id, owner)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
