use std::sync::Arc;

use anyhow::{Context, Result};

use flashnest_lib::config::Config;
use flashnest_lib::generator::GeminiGenerator;
use flashnest_lib::identity::{Identity, UserProfile};
use flashnest_lib::images::UnsplashResolver;
use flashnest_lib::scores::{FileScoreStore, FirestoreScoreStore, ScoreStore};
use flashnest_lib::session::Services;

/// Clients shared by CLI commands
pub struct App {
    pub config: Config,
    pub services: Services,
}

impl App {
    /// Load configuration and construct every client
    pub fn new(offline: bool, id_token: Option<&str>) -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let settings = &config.settings;

        let generator = GeminiGenerator::new(config.secrets.gemini_api_key.clone(), settings)
            .context("Failed to create Gemini client")?;
        let images = UnsplashResolver::new(config.secrets.unsplash_access_key.clone(), settings)
            .context("Failed to create Unsplash client")?;

        let scores: Arc<dyn ScoreStore> = if offline {
            let path = settings
                .score_file_path()
                .context("Failed to get data directory for the score file")?;
            log::info!("Keeping scores in {}", path.display());
            Arc::new(FileScoreStore::new(path))
        } else {
            let store = FirestoreScoreStore::new(&config.secrets.firebase, settings)
                .context("Failed to create Firestore client")?;
            match id_token {
                Some(token) => Arc::new(store.with_id_token(token)),
                None => Arc::new(store),
            }
        };

        let services = Services {
            generator: Arc::new(generator),
            images: Arc::new(images),
            scores,
        };

        Ok(Self { config, services })
    }
}

/// Identity holder signed in as `uid`
pub fn sign_in(uid: &str, name: Option<&str>) -> Identity {
    let mut identity = Identity::new();
    identity.sign_in(UserProfile::new(uid, name.unwrap_or(uid)));
    identity
}
