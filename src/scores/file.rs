//! Score store kept in a single local JSON file
//!
//! ```text
//! scores.json
//! {
//!   "{uid}": { "score": 40, "updatedAt": "2026-10-17T09:12:44Z" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use super::{Result, ScoreStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreEntry {
    score: u64,
    updated_at: DateTime<Utc>,
}

impl ScoreEntry {
    fn new(score: u64) -> Self {
        Self {
            score,
            updated_at: Utc::now(),
        }
    }
}

type ScoreFile = BTreeMap<String, ScoreEntry>;

/// Offline score store; writes are serialized through an async lock
pub struct FileScoreStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileScoreStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<ScoreFile> {
        if !fs::try_exists(&self.path).await? {
            return Ok(ScoreFile::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(ScoreFile::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_all(&self, scores: &ScoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(scores)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for FileScoreStore {
    async fn load_score(&self, user_id: &str) -> Result<u64> {
        let _guard = self.lock.lock().await;
        let mut scores = self.read_all().await?;

        if let Some(entry) = scores.get(user_id) {
            return Ok(entry.score);
        }

        log::info!("Creating score record for {}", user_id);
        scores.insert(user_id.to_string(), ScoreEntry::new(0));
        self.write_all(&scores).await?;
        Ok(0)
    }

    async fn peek_score(&self, user_id: &str) -> Result<u64> {
        let _guard = self.lock.lock().await;
        let scores = self.read_all().await?;
        Ok(scores.get(user_id).map(|entry| entry.score).unwrap_or(0))
    }

    async fn add_score(&self, user_id: &str, delta: u64) -> Result<u64> {
        let _guard = self.lock.lock().await;
        let mut scores = self.read_all().await?;

        let previous = scores.get(user_id).map(|entry| entry.score).unwrap_or(0);
        let entry = ScoreEntry::new(previous.saturating_add(delta));
        let score = entry.score;
        scores.insert(user_id.to_string(), entry);

        self.write_all(&scores).await?;
        log::debug!("Score for {} is now {}", user_id, score);
        Ok(score)
    }
}
