use serde::Serialize;

use crate::generator::GenerationError;
use crate::images::ImageRef;

/// Where a session is in the answer cycle
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Waiting for a deck
    Loading,
    AwaitingAnswer,
    /// An option was picked and the answer is shown
    Revealed,
    Finished {
        final_score: u64,
    },
    /// Deck generation failed; `retry` starts over
    Failed(GenerationError),
}

impl SessionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::AwaitingAnswer => "awaiting_answer",
            Self::Revealed => "revealed",
            Self::Finished { .. } => "finished",
            Self::Failed(_) => "failed",
        }
    }

    /// A card is on screen
    pub fn has_current_card(&self) -> bool {
        matches!(self, Self::AwaitingAnswer | Self::Revealed)
    }
}

/// Image for the current card
#[derive(Debug, Clone, PartialEq)]
pub enum ImageState {
    Pending,
    Ready(ImageRef),
}

/// Results delivered back to the controller from background tasks
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ImageResolved {
        index: usize,
        generation: u64,
        image: ImageRef,
    },
}

/// Result of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub correct: bool,
    pub points_awarded: u64,
    pub score: u64,
}

/// Result of an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Next { index: usize },
    Finished { final_score: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Spoken,
    Unavailable,
}

/// Read-only view of a session for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub category: String,
    pub phase: &'static str,
    pub index: usize,
    pub total: usize,
    pub score: u64,
    pub item: Option<String>,
    pub options: Vec<String>,
    pub selected_answer: Option<String>,
    /// Only present once revealed
    pub correct_answer: Option<String>,
    pub image: Option<ImageRef>,
    pub error: Option<String>,
    pub persistence_degraded: bool,
}
