use anyhow::Result;

use flashnest_lib::catalog::CATEGORIES;

use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(format: &OutputFormat, use_color: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = CATEGORIES
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "name": c.name,
                        "emoji": c.emoji,
                        "slug": c.slug(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for category in CATEGORIES {
                println!(
                    "{} {:<12} {}",
                    category.emoji,
                    category.name,
                    paint(&category.slug(), Color::DIM, use_color)
                );
            }
        }
    }

    Ok(())
}
