use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{deck_prompt, parse_deck, ContentGenerator, GenerationError};
use crate::config::Settings;
use crate::flashcards::Deck;
use crate::http::{build_client, normalize_base_url, HttpOptions};
use crate::retry::{with_retry, RetryPolicy};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Deck generator backed by the Gemini `generateContent` endpoint
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    deck_size: usize,
    retry: RetryPolicy,
}

impl GeminiGenerator {
    pub fn new(api_key: String, settings: &Settings) -> Result<Self, GenerationError> {
        let options = HttpOptions::from(settings);
        let client = build_client(&options)?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&settings.gemini_base_url),
            api_key,
            model: settings.gemini_model.clone(),
            deck_size: settings.deck_size,
            retry: options.retry,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// One request, returning the generated text blob
    async fn request_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::Blocked(reason));
        }

        parsed
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(GenerationError::MissingContent)
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate_deck(&self, category: &str) -> Result<Deck, GenerationError> {
        let prompt = deck_prompt(category, self.deck_size);
        let prompt = prompt.as_str();

        log::info!("Generating {} cards for category '{}'", self.deck_size, category);

        let text = with_retry(
            &self.retry,
            "generate deck",
            || self.request_text(prompt),
            GenerationError::is_transient,
        )
        .await?;

        let deck = parse_deck(category, &text)?;
        log::info!("Generated {} cards for '{}'", deck.len(), category);
        Ok(deck)
    }
}
