//! Flashcard - the unit being learned
//!
//! Cards are produced by upstream collaborators (manual entry, generation
//! pipelines) and are never mutated by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source kind recorded when the creator does not supply one
pub const DEFAULT_SOURCE_KIND: &str = "direct";

/// A front/back flashcard owned by one learner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// Where the card came from ("direct", "material", "lecture", ...)
    pub source_kind: String,
    /// Owning learner
    pub owner: String,
    /// When the card was created; also its first due date
    pub created_at: DateTime<Utc>,
}

/// Input for creating a card
///
/// Uses `deny_unknown_fields` to reject unexpected payload fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCard {
    pub owner: String,
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<String>,
}

impl NewCard {
    pub fn new(owner: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            front: front.into(),
            back: back.into(),
            source_kind: None,
        }
    }

    pub fn with_source_kind(mut self, source_kind: impl Into<String>) -> Self {
        self.source_kind = Some(source_kind.into());
        self
    }

    /// Source kind to persist, falling back to [`DEFAULT_SOURCE_KIND`]
    pub fn effective_source_kind(&self) -> &str {
        self.source_kind
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE_KIND)
    }

    /// Check required fields, returning a message for the first problem found
    pub fn validate(&self) -> Result<(), String> {
        if self.owner.trim().is_empty() {
            return Err("Owner is required".to_string());
        }
        if self.front.trim().is_empty() || self.back.trim().is_empty() {
            return Err("Front and back are required".to_string());
        }
        Ok(())
    }
}
