pub mod categories;
pub mod play;
pub mod score;
