//! Card module - core types
//!
//! - [`Card`]: immutable front/back content owned by one learner
//! - [`Mastery`]: the scheduling state the review pipeline maintains for it

mod flashcard;
mod mastery;

pub use flashcard::{Card, NewCard, DEFAULT_SOURCE_KIND};
pub use mastery::Mastery;

use serde::{Deserialize, Serialize};

/// A card paired with its effective scheduling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardWithMastery {
    pub card: Card,
    pub mastery: Mastery,
}

impl CardWithMastery {
    /// Pair a card with its stored state, or the lazy default when none exists
    pub fn new(card: Card, mastery: Option<Mastery>) -> Self {
        let mastery = mastery.unwrap_or_else(|| Mastery::initial(card.id.clone(), card.created_at));
        Self { card, mastery }
    }
}
