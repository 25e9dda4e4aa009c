//! Flashcard and deck models for quiz sessions
//!
//! Cards are produced by the content generator and never change after
//! construction. A deck is replaced wholesale when regenerated.

pub mod models;

pub use models::*;
