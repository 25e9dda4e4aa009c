//! Data models for the flashcard system

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every card offers exactly this many answer options
pub const OPTIONS_PER_CARD: usize = 4;

/// Ways a generated card can violate the card invariants
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardDefect {
    #[error("expected 4 options, got {0}")]
    WrongOptionCount(usize),

    #[error("duplicate option: {0}")]
    DuplicateOption(String),

    #[error("correct answer {0:?} is not one of the options")]
    AnswerNotInOptions(String),
}

/// A card exactly as the generator emits it, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFlashcard {
    pub item: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// A multiple-choice flashcard
///
/// Construction validates that there are four distinct options and that
/// the correct answer is one of them, so a `Flashcard` in hand can always
/// be answered correctly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFlashcard")]
pub struct Flashcard {
    item: String,
    options: Vec<String>,
    correct_answer: String,
}

impl Flashcard {
    pub fn new(
        item: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, CardDefect> {
        let correct_answer = correct_answer.into();

        if options.len() != OPTIONS_PER_CARD {
            return Err(CardDefect::WrongOptionCount(options.len()));
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(CardDefect::DuplicateOption(option.clone()));
            }
        }

        if !seen.contains(correct_answer.as_str()) {
            return Err(CardDefect::AnswerNotInOptions(correct_answer));
        }

        Ok(Self {
            item: item.into(),
            options,
            correct_answer,
        })
    }

    /// The prompt shown (and spoken) for this card
    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

impl TryFrom<RawFlashcard> for Flashcard {
    type Error = CardDefect;

    fn try_from(raw: RawFlashcard) -> Result<Self, Self::Error> {
        Flashcard::new(raw.item, raw.options, raw.correct_answer)
    }
}

/// An ordered set of flashcards generated for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    category: String,
    cards: Vec<Flashcard>,
}

impl Deck {
    pub fn new(category: impl Into<String>, cards: Vec<Flashcard>) -> Self {
        Self {
            category: category.into(),
            cards,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn get(&self, index: usize) -> Option<&Flashcard> {
        self.cards.get(index)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Index of the final card, `None` for an empty deck
    pub fn last_index(&self) -> Option<usize> {
        self.cards.len().checked_sub(1)
    }
}
