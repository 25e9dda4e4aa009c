use anyhow::{Context, Result};

use flashnest_lib::identity::Identity;
use flashnest_lib::scores::ScoreStore;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// Dashboard view: reads the score without creating a record
pub async fn run(
    app: &App,
    identity: &Identity,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let profile = identity.current_user().context("Not signed in")?;
    let score = app
        .services
        .scores
        .peek_score(&profile.uid)
        .await
        .context("Failed to read score")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "uid": profile.uid,
                "displayName": profile.display_name,
                "avatar": profile.avatar_url(),
                "score": score,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", paint(&profile.display_name, Color::BOLD, use_color));
            println!("avatar: {}", profile.avatar_url());
            println!("score:  {}", score);
        }
    }

    Ok(())
}
