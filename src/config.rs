//! Startup configuration.
//!
//! Upstream secrets come from the environment and are all required: a
//! missing one is reported together with every other missing one rather
//! than failing on the first. Tunables come from an optional TOML file and
//! fall back to defaults field by field.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetrySettings;

pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const UNSPLASH_ACCESS_KEY: &str = "UNSPLASH_ACCESS_KEY";
pub const FIREBASE_API_KEY: &str = "FIREBASE_API_KEY";
pub const FIREBASE_AUTH_DOMAIN: &str = "FIREBASE_AUTH_DOMAIN";
pub const FIREBASE_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
pub const FIREBASE_STORAGE_BUCKET: &str = "FIREBASE_STORAGE_BUCKET";
pub const FIREBASE_MESSAGING_SENDER_ID: &str = "FIREBASE_MESSAGING_SENDER_ID";
pub const FIREBASE_APP_ID: &str = "FIREBASE_APP_ID";
pub const FIREBASE_MEASUREMENT_ID: &str = "FIREBASE_MEASUREMENT_ID";

/// Every environment variable that must be present at startup
pub const REQUIRED_SECRETS: [&str; 9] = [
    GEMINI_API_KEY,
    UNSPLASH_ACCESS_KEY,
    FIREBASE_API_KEY,
    FIREBASE_AUTH_DOMAIN,
    FIREBASE_PROJECT_ID,
    FIREBASE_STORAGE_BUCKET,
    FIREBASE_MESSAGING_SENDER_ID,
    FIREBASE_APP_ID,
    FIREBASE_MEASUREMENT_ID,
];

/// Environment variable pointing at a settings file
pub const SETTINGS_PATH_ENV: &str = "FLASHNEST_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingSecrets(Vec<&'static str>),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Identifiers of the Firebase project backing identity and scores
#[derive(Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,
}

/// API keys and project identifiers
#[derive(Clone)]
pub struct Secrets {
    pub gemini_api_key: String,
    pub unsplash_access_key: String,
    pub firebase: FirebaseConfig,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut take = |name: &'static str| -> String {
            match lookup(name).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => value,
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let secrets = Self {
            gemini_api_key: take(GEMINI_API_KEY),
            unsplash_access_key: take(UNSPLASH_ACCESS_KEY),
            firebase: FirebaseConfig {
                api_key: take(FIREBASE_API_KEY),
                auth_domain: take(FIREBASE_AUTH_DOMAIN),
                project_id: take(FIREBASE_PROJECT_ID),
                storage_bucket: take(FIREBASE_STORAGE_BUCKET),
                messaging_sender_id: take(FIREBASE_MESSAGING_SENDER_ID),
                app_id: take(FIREBASE_APP_ID),
                measurement_id: take(FIREBASE_MEASUREMENT_ID),
            },
        };

        if !missing.is_empty() {
            return Err(ConfigError::MissingSecrets(missing));
        }

        Ok(secrets)
    }
}

/// Tunables read from the settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    /// Number of cards requested per deck
    #[serde(default = "default_deck_size")]
    pub deck_size: usize,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_unsplash_base_url")]
    pub unsplash_base_url: String,
    #[serde(default = "default_firestore_base_url")]
    pub firestore_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Score file used in offline mode (defaults to the data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_file: Option<PathBuf>,
}

fn default_deck_size() -> usize {
    15
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_unsplash_base_url() -> String {
    "https://api.unsplash.com".to_string()
}

fn default_firestore_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deck_size: default_deck_size(),
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
            unsplash_base_url: default_unsplash_base_url(),
            firestore_base_url: default_firestore_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retry: RetrySettings::default(),
            score_file: None,
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("flashnest").join("config.toml"))
    }

    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from an explicit file, which must exist
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Resolve the settings file: `$FLASHNEST_CONFIG` must exist if set,
    /// the default location is optional.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(SETTINGS_PATH_ENV) {
            log::info!("Loading settings from {}", path);
            return Self::from_file(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                log::info!("Loading settings from {}", path.display());
                Self::from_file(&path)
            }
            _ => {
                log::debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Score file for offline mode
    pub fn score_file_path(&self) -> Option<PathBuf> {
        self.score_file
            .clone()
            .or_else(|| dirs::data_local_dir().map(|p| p.join("flashnest").join("scores.json")))
    }
}

/// Everything the composition root needs to build the clients
#[derive(Clone)]
pub struct Config {
    pub secrets: Secrets,
    pub settings: Settings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load()?;
        Ok(Self { secrets, settings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        REQUIRED_SECRETS
            .iter()
            .map(|name| (*name, format!("value-for-{}", name.to_lowercase())))
            .collect()
    }

    #[test]
    fn test_all_secrets_present() {
        let env = full_env();
        let secrets = Secrets::from_lookup(|name| env.get(name).cloned()).unwrap();

        assert_eq!(secrets.gemini_api_key, "value-for-gemini_api_key");
        assert_eq!(secrets.firebase.project_id, "value-for-firebase_project_id");
    }

    #[test]
    fn test_missing_secrets_are_all_listed() {
        let mut env = full_env();
        env.remove(GEMINI_API_KEY);
        env.remove(FIREBASE_APP_ID);
        env.insert(FIREBASE_MEASUREMENT_ID, "   ".to_string());

        let err = Secrets::from_lookup(|name| env.get(name).cloned())
            .err()
            .unwrap();

        match err {
            ConfigError::MissingSecrets(missing) => {
                assert_eq!(
                    missing,
                    vec![GEMINI_API_KEY, FIREBASE_APP_ID, FIREBASE_MEASUREMENT_ID]
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_secrets_message() {
        let err = Secrets::from_lookup(|_| None).err().unwrap();
        let message = err.to_string();
        for name in REQUIRED_SECRETS {
            assert!(message.contains(name), "{} not in {}", name, message);
        }
    }

    #[test]
    fn test_settings_defaults_fill_gaps() {
        let settings = Settings::from_toml(
            r#"
            deck_size = 5

            [retry]
            max_attempts = 1
            "#,
        )
        .unwrap();

        assert_eq!(settings.deck_size, 5);
        assert_eq!(settings.gemini_model, "gemini-2.0-flash");
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.retry.max_attempts, 1);
        assert_eq!(settings.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_settings_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "gemini_model = \"gemini-2.5-flash\"\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.gemini_model, "gemini-2.5-flash");
        assert_eq!(settings.deck_size, 15);
    }

    #[test]
    fn test_settings_file_missing() {
        let err = Settings::from_file(Path::new("/nonexistent/flashnest.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            Settings::from_toml("deck_size = \"many\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
