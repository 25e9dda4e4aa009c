//! Deck generation through a text-generation API.
//!
//! The generator asks the model for a JSON array of cards and validates
//! every record. A malformed record fails the whole deck: nothing is
//! silently dropped or repaired.

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use crate::flashcards::{Deck, Flashcard, RawFlashcard};
use crate::http::is_transient_status;

pub use gemini::GeminiGenerator;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Generation request failed: {0}")]
    Transport(String),

    #[error("Generation request timed out")]
    Timeout,

    #[error("Generation request was blocked: {0}")]
    Blocked(String),

    #[error("Generation response contained no text")]
    MissingContent,

    #[error("Generated deck is not valid JSON: {0}")]
    Malformed(String),

    #[error("Generated card {index} is invalid: {reason}")]
    InvalidCard { index: usize, reason: String },

    #[error("Generated deck is empty")]
    EmptyDeck,
}

impl GenerationError {
    /// Whether repeating the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_deck(&self, category: &str) -> Result<Deck, GenerationError>;
}

/// Instruction sent to the model for one deck
pub fn deck_prompt(category: &str, deck_size: usize) -> String {
    format!(
        "Create a JSON array of {} flashcards for the category \"{}\". \
         Each object must have these exact keys: \"item\" (string), \
         \"options\" (an array of 4 strings, one of which must be the correct answer), \
         and \"correctAnswer\" (a string that exactly matches one of the options).",
        deck_size, category
    )
}

/// Parse the model's text into a deck, rejecting any invalid card
pub fn parse_deck(category: &str, text: &str) -> Result<Deck, GenerationError> {
    let raw: Vec<RawFlashcard> =
        serde_json::from_str(text.trim()).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if raw.is_empty() {
        return Err(GenerationError::EmptyDeck);
    }

    let cards = raw
        .into_iter()
        .enumerate()
        .map(|(index, card)| {
            Flashcard::try_from(card).map_err(|defect| GenerationError::InvalidCard {
                index,
                reason: defect.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Deck::new(category, cards))
}
