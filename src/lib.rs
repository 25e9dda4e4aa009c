//! FlashNest: AI-generated flashcard quizzes.
//!
//! A quiz session turns a category name into a deck of multiple-choice
//! flashcards (text generation API), illustrates each card (image search
//! API) and keeps a cumulative per-user score (remote document store).
//!
//! The [`session::SessionController`] owns all session state. Its
//! collaborators are injected as trait objects so the binary decides
//! which concrete clients to build.

pub mod catalog;
pub mod config;
pub mod flashcards;
pub mod generator;
pub mod identity;
pub mod images;
pub mod retry;
pub mod scores;
pub mod session;
pub mod speech;

mod http;

#[cfg(test)]
mod test_support;
