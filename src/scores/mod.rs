//! Per-user cumulative score storage
//!
//! Every store is delta-additive: `add_score` increments and returns the new
//! total, so concurrent sessions for the same user never overwrite each
//! other.

mod file;
mod firestore;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::is_transient_status;

pub use file::FileScoreStore;
pub use firestore::FirestoreScoreStore;
pub use memory::MemoryScoreStore;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Score store returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Could not reach score store: {0}")]
    Connect(String),

    #[error("Score store request failed: {0}")]
    Transport(String),

    #[error("Score store request timed out")]
    Timeout,

    #[error("Score store response is malformed: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistenceError {
    /// Safe to repeat for idempotent requests
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }

    /// Safe to repeat for a non-idempotent write: the server cannot have
    /// applied it.
    pub fn was_not_applied(&self) -> bool {
        match self {
            Self::Connect(_) => true,
            Self::Http { status, .. } => *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Persisted score, creating a zero record when none exists
    async fn load_score(&self, user_id: &str) -> Result<u64>;

    /// Persisted score or 0, without creating anything
    async fn peek_score(&self, user_id: &str) -> Result<u64>;

    /// Add `delta` to the persisted score and return the new total
    async fn add_score(&self, user_id: &str, delta: u64) -> Result<u64>;
}
