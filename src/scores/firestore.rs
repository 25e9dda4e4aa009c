//! Score store on the Firestore REST API
//!
//! One document per user at `users/{uid}` holding an integer `score` field.
//! Increments go through `documents:commit` with a field transform, so the
//! addition happens on the server and concurrent writers never clobber
//! each other.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{PersistenceError, Result, ScoreStore};
use crate::config::{FirebaseConfig, Settings};
use crate::http::{build_client, normalize_base_url, HttpOptions};
use crate::retry::{with_retry, RetryPolicy};

const SCORE_FIELD: &str = "score";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    integer_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    double_value: Option<f64>,
}

impl FirestoreValue {
    fn integer(n: u64) -> Self {
        Self {
            integer_value: Some(Value::String(n.to_string())),
            double_value: None,
        }
    }

    /// int64 values arrive as strings; negative scores read as 0
    fn as_score(&self) -> Option<u64> {
        if let Some(value) = &self.integer_value {
            let n = match value {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            }?;
            return Some(n.max(0) as u64);
        }
        self.double_value.map(|d| d.max(0.0) as u64)
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
}

impl Document {
    fn score(&self) -> Result<u64> {
        match self.fields.get(SCORE_FIELD) {
            None => Ok(0),
            Some(value) => value
                .as_score()
                .ok_or_else(|| PersistenceError::Malformed("score is not a number".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<WriteResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteResult {
    #[serde(default)]
    transform_results: Vec<FirestoreValue>,
}

/// Body of a commit that atomically adds `delta` to the score field
fn increment_request(document: &str, delta: u64) -> Value {
    json!({
        "writes": [{
            "transform": {
                "document": document,
                "fieldTransforms": [{
                    "fieldPath": SCORE_FIELD,
                    "increment": FirestoreValue::integer(delta),
                }]
            }
        }]
    })
}

pub struct FirestoreScoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: String,
    id_token: Option<String>,
    retry: RetryPolicy,
}

impl FirestoreScoreStore {
    pub fn new(firebase: &FirebaseConfig, settings: &Settings) -> Result<Self> {
        let options = HttpOptions::from(settings);
        let client = build_client(&options)?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&settings.firestore_base_url),
            project_id: firebase.project_id.clone(),
            api_key: firebase.api_key.clone(),
            id_token: None,
            retry: options.retry,
        })
    }

    /// Send the signed-in user's ID token so security rules can match `uid`
    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    fn documents_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, uid: &str) -> String {
        format!("{}/users/{}", self.documents_path(), uid)
    }

    fn document_url(&self, uid: &str) -> String {
        format!(
            "{}/v1/{}/users/{}",
            self.base_url,
            self.documents_path(),
            urlencoding::encode(uid)
        )
    }

    fn commit_url(&self) -> String {
        format!("{}/v1/{}:commit", self.base_url, self.documents_path())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        match &self.id_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_document(&self, uid: &str) -> Result<Option<u64>> {
        let response = self
            .authorize(self.client.get(self.document_url(uid)))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PersistenceError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let document: Document =
            serde_json::from_str(&body).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
        document.score().map(Some)
    }

    /// Create the zero record. Returns false when someone else created it first.
    async fn create_document(&self, uid: &str) -> Result<bool> {
        let body = json!({ "fields": { SCORE_FIELD: FirestoreValue::integer(0) } });

        let response = self
            .authorize(
                self.client
                    .patch(self.document_url(uid))
                    .query(&[("currentDocument.exists", "false")]),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }

        let text = response.text().await.unwrap_or_default();
        match status {
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Ok(false),
            StatusCode::BAD_REQUEST if text.contains("FAILED_PRECONDITION") => Ok(false),
            _ => Err(PersistenceError::Http {
                status: status.as_u16(),
                body: text,
            }),
        }
    }

    async fn commit_increment(&self, uid: &str, delta: u64) -> Result<u64> {
        let body = increment_request(&self.document_name(uid), delta);

        let response = self
            .authorize(self.client.post(self.commit_url()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let text = response.text().await?;
        let commit: CommitResponse =
            serde_json::from_str(&text).map_err(|e| PersistenceError::Malformed(e.to_string()))?;

        commit
            .write_results
            .first()
            .and_then(|result| result.transform_results.first())
            .and_then(FirestoreValue::as_score)
            .ok_or_else(|| {
                PersistenceError::Malformed("commit returned no transform result".to_string())
            })
    }
}

#[async_trait]
impl ScoreStore for FirestoreScoreStore {
    async fn load_score(&self, user_id: &str) -> Result<u64> {
        let read = || self.read_document(user_id);

        if let Some(score) =
            with_retry(&self.retry, "read score", read, PersistenceError::is_transient).await?
        {
            return Ok(score);
        }

        let created = with_retry(
            &self.retry,
            "create score record",
            || self.create_document(user_id),
            PersistenceError::is_transient,
        )
        .await?;

        if created {
            log::info!("Created score record for {}", user_id);
            return Ok(0);
        }

        log::debug!("Score record for {} created concurrently, re-reading", user_id);
        let score = with_retry(&self.retry, "read score", read, PersistenceError::is_transient)
            .await?;
        Ok(score.unwrap_or(0))
    }

    async fn peek_score(&self, user_id: &str) -> Result<u64> {
        let score = with_retry(
            &self.retry,
            "read score",
            || self.read_document(user_id),
            PersistenceError::is_transient,
        )
        .await?;
        Ok(score.unwrap_or(0))
    }

    async fn add_score(&self, user_id: &str, delta: u64) -> Result<u64> {
        // A commit that timed out may still have been applied
        with_retry(
            &self.retry,
            "increment score",
            || self.commit_increment(user_id, delta),
            PersistenceError::was_not_applied,
        )
        .await
    }
}
