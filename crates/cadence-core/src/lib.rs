//! # Cadence Core
//!
//! Spaced-repetition review scheduling for flashcards.
//!
//! - **Scheduler**: pure ease/interval scheduling (Again/Hard/Good/Easy)
//! - **Storage**: SQLite card store with lazy mastery rows and optimistic versioning
//! - **DueQueue**: ordered, capped selection of the cards due for an owner
//! - **ReviewService**: validated, idempotent, transactional review submission
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chrono::Utc;
//! use cadence_core::{DueQueue, NewCard, ReviewService, ReviewSubmission, Storage};
//!
//! // Create storage (uses default platform-specific location)
//! let storage = Arc::new(Storage::new(None)?);
//!
//! // Add a card
//! let card = storage.create_card(NewCard::new("alice", "What is ATP?", "Cell energy currency"), Utc::now())?;
//!
//! // Fetch what is due and review it
//! let queue = DueQueue::new(Arc::clone(&storage));
//! let due = queue.due_cards("alice", Utc::now(), None, None)?;
//!
//! let service = ReviewService::new(storage);
//! let outcome = service.submit_review("alice", &ReviewSubmission::new(&card.id, 3), Utc::now())?;
//! println!("next review in {} days", outcome.mastery.interval_days);
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): compile SQLite from source
//! - `encryption`: SQLCipher, keyed from `CADENCE_ENCRYPTION_KEY`

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod card;
pub mod queue;
pub mod review;
pub mod scheduling;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use card::{Card, CardWithMastery, Mastery, NewCard, DEFAULT_SOURCE_KIND};

pub use scheduling::{InvalidQuality, PreviewResults, Quality, Scheduler};

pub use storage::{
    CardRecord, CommitOutcome, Result, ReviewCommit, ReviewRecord, ReviewStats, Storage,
    StorageError,
};

pub use queue::{
    DueQueue, DueQueueConfig, DEFAULT_DUE_LIMIT, DEFAULT_NEW_CARD_CAP, MAX_DUE_LIMIT,
};

pub use review::{ReviewError, ReviewOutcome, ReviewService, ReviewSubmission};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, CardWithMastery, DueQueue, Mastery, NewCard, Quality, Result, ReviewError,
        ReviewOutcome, ReviewService, ReviewSubmission, Scheduler, Storage, StorageError,
    };
}
