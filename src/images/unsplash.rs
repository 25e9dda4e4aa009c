use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ImageRef, ImageResolutionError, ImageResolver};
use crate::config::Settings;
use crate::http::{build_client, normalize_base_url, HttpOptions};
use crate::retry::{with_retry, RetryPolicy};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: Option<PhotoUrls>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
}

/// Image resolver backed by the Unsplash photo search
pub struct UnsplashResolver {
    client: Client,
    base_url: String,
    access_key: String,
    retry: RetryPolicy,
}

impl UnsplashResolver {
    pub fn new(access_key: String, settings: &Settings) -> Result<Self, ImageResolutionError> {
        let options = HttpOptions::from(settings);
        let client = build_client(&options)?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&settings.unsplash_base_url),
            access_key,
            retry: options.retry,
        })
    }

    /// First display-resolution result for `term`, if any
    pub async fn search(&self, term: &str) -> Result<Option<String>, ImageResolutionError> {
        let url = format!("{}/search/photos", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("page", "1"),
                ("query", term),
                ("per_page", "1"),
                ("client_id", self.access_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageResolutionError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| ImageResolutionError::Malformed(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .next()
            .and_then(|photo| photo.urls)
            .and_then(|urls| urls.regular))
    }
}

#[async_trait]
impl ImageResolver for UnsplashResolver {
    async fn resolve_image(&self, term: &str) -> ImageRef {
        let result = with_retry(
            &self.retry,
            "image search",
            || self.search(term),
            ImageResolutionError::is_transient,
        )
        .await;

        match result {
            Ok(Some(url)) => ImageRef::found(url),
            Ok(None) => {
                log::info!("No image found for '{}', using placeholder", term);
                ImageRef::placeholder(term)
            }
            Err(e) => {
                log::warn!("Image search for '{}' failed, using placeholder: {}", term, e);
                ImageRef::placeholder(term)
            }
        }
    }
}
