use flashnest_lib::images::ImageSource;
use flashnest_lib::session::SessionSnapshot;

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
}

/// Wrap `text` in `color` when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Card prompt with numbered options
pub fn render_card(snapshot: &SessionSnapshot, use_color: bool) -> String {
    let mut lines = Vec::new();

    lines.push(paint(
        &format!(
            "{}  card {}/{}  score {}",
            snapshot.category,
            snapshot.index + 1,
            snapshot.total,
            snapshot.score
        ),
        Color::DIM,
        use_color,
    ));

    if let Some(item) = &snapshot.item {
        lines.push(paint(item, Color::BOLD, use_color));
    }

    lines.push(match &snapshot.image {
        Some(image) if image.source == ImageSource::Placeholder => {
            format!("image: {} (placeholder)", image.url)
        }
        Some(image) => format!("image: {}", image.url),
        None => "image: loading...".to_string(),
    });

    for (i, option) in snapshot.options.iter().enumerate() {
        lines.push(format!("  {}) {}", i + 1, option));
    }

    lines.join("\n")
}

/// Feedback after an answer
pub fn render_reveal(snapshot: &SessionSnapshot, correct: bool, use_color: bool) -> String {
    let answer = snapshot.correct_answer.as_deref().unwrap_or_default();
    if correct {
        paint(
            &format!("Correct! +10 (score {})", snapshot.score),
            Color::GREEN,
            use_color,
        )
    } else {
        paint(
            &format!("Not quite. The answer is {}.", answer),
            Color::RED,
            use_color,
        )
    }
}

pub fn render_warning(text: &str, use_color: bool) -> String {
    paint(text, Color::YELLOW, use_color)
}
