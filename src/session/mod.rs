//! Flashcard quiz sessions

mod controller;
mod state;
mod writer;

pub use controller::{Services, SessionController};
pub use state::{
    Answer, ImageState, Progress, ReplayOutcome, SessionEvent, SessionPhase, SessionSnapshot,
};
pub use writer::FlushReport;

/// Points for each correctly answered card
pub const POINTS_PER_CORRECT: u64 = 10;
