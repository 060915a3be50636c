//! Due Queue
//!
//! Read-only selection of the cards an owner should review next. Cards with
//! no stored mastery are included with their default state (due at
//! creation); nothing is written.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::card::CardWithMastery;
use crate::storage::{Result, Storage};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Default maximum number of cards returned
pub const DEFAULT_DUE_LIMIT: usize = 50;

/// Default maximum number of new (`reps == 0`) cards returned
pub const DEFAULT_NEW_CARD_CAP: usize = 20;

/// Hard upper bound on `limit`
pub const MAX_DUE_LIMIT: usize = 500;

/// Queue sizing defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueQueueConfig {
    /// Cards returned when the caller gives no limit
    pub limit: usize,
    /// New cards returned when the caller gives no cap
    pub new_card_cap: usize,
}

impl Default for DueQueueConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_DUE_LIMIT,
            new_card_cap: DEFAULT_NEW_CARD_CAP,
        }
    }
}

impl DueQueueConfig {
    /// Resolve caller overrides against the defaults.
    ///
    /// `limit` ends up in `[1, 500]`, `new_card_cap` in `[0, limit]`.
    pub fn resolve(&self, limit: Option<usize>, new_card_cap: Option<usize>) -> (usize, usize) {
        let limit = limit.unwrap_or(self.limit).clamp(1, MAX_DUE_LIMIT);
        let new_card_cap = new_card_cap.unwrap_or(self.new_card_cap).min(limit);
        (limit, new_card_cap)
    }
}

// ============================================================================
// ORDERING
// ============================================================================

/// Review order: oldest due first, then most-lapsed, then oldest card, then id
pub fn review_order(a: &CardWithMastery, b: &CardWithMastery) -> Ordering {
    a.mastery
        .due_at
        .cmp(&b.mastery.due_at)
        .then_with(|| b.mastery.lapses.cmp(&a.mastery.lapses))
        .then_with(|| a.card.created_at.cmp(&b.card.created_at))
        .then_with(|| a.card.id.cmp(&b.card.id))
}

/// Order candidates and apply the limit and new-card cap
pub fn select_due(
    mut candidates: Vec<CardWithMastery>,
    limit: usize,
    new_card_cap: usize,
) -> Vec<CardWithMastery> {
    candidates.sort_by(review_order);

    let mut selected = Vec::with_capacity(limit.min(candidates.len()));
    let mut new_cards = 0;

    for entry in candidates {
        if selected.len() >= limit {
            break;
        }
        if entry.mastery.is_new() {
            if new_cards >= new_card_cap {
                continue;
            }
            new_cards += 1;
        }
        selected.push(entry);
    }

    selected
}

// ============================================================================
// DUE QUEUE
// ============================================================================

/// Due-card selection for one owner at a given time
pub struct DueQueue {
    storage: Arc<Storage>,
    config: DueQueueConfig,
}

impl DueQueue {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self::with_config(storage, DueQueueConfig::default())
    }

    pub fn with_config(storage: Arc<Storage>, config: DueQueueConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &DueQueueConfig {
        &self.config
    }

    /// Cards eligible for review at `now`, in review order.
    ///
    /// `None` for `limit` or `new_card_cap` uses the configured default.
    pub fn due_cards(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        limit: Option<usize>,
        new_card_cap: Option<usize>,
    ) -> Result<Vec<CardWithMastery>> {
        let (limit, new_card_cap) = self.config.resolve(limit, new_card_cap);
        let candidates = self.storage.due_candidates(owner, now)?;
        let candidate_count = candidates.len();

        let selected = select_due(candidates, limit, new_card_cap);
        tracing::debug!(
            owner,
            candidates = candidate_count,
            selected = selected.len(),
            limit,
            new_card_cap,
            "Built due queue"
        );
        Ok(selected)
    }
}

// ============================================================================
// TESTS
// ============================================================================
