//! The categories a player can pick from.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: &'static str,
    pub emoji: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category { name: "Animals", emoji: "🐘" },
    Category { name: "Fruits", emoji: "🍎" },
    Category { name: "Vegetables", emoji: "🥕" },
    Category { name: "Colors", emoji: "🎨" },
    Category { name: "Daily Items", emoji: "🛋️" },
];

impl Category {
    /// Route segment for this category, e.g. `daily-items`
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replacen(' ', "-", 1)
    }
}

/// Look up a catalog entry by slug or name, ignoring case
pub fn find(segment: &str) -> Option<&'static Category> {
    let wanted = segment.trim().to_lowercase();
    CATEGORIES
        .iter()
        .find(|c| c.slug() == wanted || c.name.to_lowercase() == wanted)
}

/// Category text to generate a deck for. Unknown segments pass through.
pub fn resolve(segment: &str) -> String {
    match find(segment) {
        Some(category) => category.name.to_string(),
        None => segment.trim().to_string(),
    }
}
