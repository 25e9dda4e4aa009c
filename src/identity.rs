//! The signed-in user.
//!
//! Identity is held by an explicitly constructed [`Identity`] owned by the
//! composition root. Quiz code only ever consumes the stable `uid`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            email: String::new(),
            photo_url: None,
        }
    }

    /// Profile photo, or a placeholder showing the first letter of the name
    pub fn avatar_url(&self) -> String {
        if let Some(url) = &self.photo_url {
            return url.clone();
        }
        let initial: String = self.display_name.chars().take(1).collect();
        format!(
            "https://placehold.co/96x96/E2E8F0/4A5568?text={}",
            urlencoding::encode(&initial)
        )
    }
}

/// Holder of the current user
#[derive(Debug, Default)]
pub struct Identity {
    current: Option<UserProfile>,
}

impl Identity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.current.as_ref()
    }

    /// Stable key for per-user data
    pub fn uid(&self) -> Option<&str> {
        self.current.as_ref().map(|u| u.uid.as_str())
    }

    pub fn sign_in(&mut self, profile: UserProfile) {
        log::info!("Signed in as {} ({})", profile.display_name, profile.uid);
        self.current = Some(profile);
    }

    pub fn sign_out(&mut self) {
        if let Some(profile) = self.current.take() {
            log::info!("Signed out {}", profile.uid);
        }
    }
}
