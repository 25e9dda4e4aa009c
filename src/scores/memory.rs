use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Result, ScoreStore};

/// Process-local score store
#[derive(Default)]
pub struct MemoryScoreStore {
    scores: Mutex<HashMap<String, u64>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(user_id: &str, score: u64) -> Self {
        let store = Self::new();
        store.entries().insert(user_id.to_string(), score);
        store
    }

    /// Whether a record exists for `user_id`
    pub fn contains(&self, user_id: &str) -> bool {
        self.entries().contains_key(user_id)
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.scores.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn load_score(&self, user_id: &str) -> Result<u64> {
        Ok(*self.entries().entry(user_id.to_string()).or_insert(0))
    }

    async fn peek_score(&self, user_id: &str) -> Result<u64> {
        Ok(self.entries().get(user_id).copied().unwrap_or(0))
    }

    async fn add_score(&self, user_id: &str, delta: u64) -> Result<u64> {
        let mut entries = self.entries();
        let score = entries.entry(user_id.to_string()).or_insert(0);
        *score = score.saturating_add(delta);
        Ok(*score)
    }
}
