//! Illustrative images for flashcards.
//!
//! Images are decoration: resolving one never fails. When the search API
//! errors or finds nothing, a placeholder built from the term is returned.

mod unsplash;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::http::is_transient_status;

pub use unsplash::UnsplashResolver;

const PLACEHOLDER_BASE: &str = "https://placehold.co/600x400/E2E8F0/4A5568";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageResolutionError {
    #[error("Image search failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Image search request failed: {0}")]
    Transport(String),

    #[error("Image search timed out")]
    Timeout,

    #[error("Image search response is malformed: {0}")]
    Malformed(String),
}

impl ImageResolutionError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => is_transient_status(*status),
            Self::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for ImageResolutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Where an image URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Search,
    Placeholder,
}

/// A displayable image for one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
    pub source: ImageSource,
}

impl ImageRef {
    pub fn found(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source: ImageSource::Search,
        }
    }

    pub fn placeholder(term: &str) -> Self {
        Self {
            url: placeholder_url(term),
            source: ImageSource::Placeholder,
        }
    }
}

/// Deterministic fallback image showing the term itself
pub fn placeholder_url(term: &str) -> String {
    format!("{}?text={}", PLACEHOLDER_BASE, urlencoding::encode(term))
}

#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve_image(&self, term: &str) -> ImageRef;
}
