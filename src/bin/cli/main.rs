mod app;
mod commands;
mod render;

use std::io::IsTerminal;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flashnest", about = "AI-generated flashcard quizzes", version)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Keep scores in a local file instead of Firestore
    #[arg(long, global = true)]
    offline: bool,

    /// Firebase ID token for the signed-in user
    #[arg(long, global = true)]
    id_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List the playable categories
    Categories,

    /// Show a user's cumulative score
    Score {
        /// User id
        #[arg(long)]
        user: String,
        /// Display name for the avatar
        #[arg(long)]
        name: Option<String>,
    },

    /// Play a quiz
    Play {
        /// Category name or slug (e.g. "animals", "daily-items")
        category: String,
        /// User id; without one the score is not saved
        #[arg(long)]
        user: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Never use text-to-speech
        #[arg(long)]
        no_speech: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Command::Categories => {
            commands::categories::run(&cli.format, use_color)?;
        }
        Command::Score { user, name } => {
            let app = app::App::new(cli.offline, cli.id_token.as_deref())?;
            let identity = app::sign_in(&user, name.as_deref());
            commands::score::run(&app, &identity, &cli.format, use_color).await?;
        }
        Command::Play {
            category,
            user,
            name,
            no_speech,
        } => {
            let app = app::App::new(cli.offline, cli.id_token.as_deref())?;
            let identity = match user {
                Some(uid) => app::sign_in(&uid, name.as_deref()),
                None => flashnest_lib::identity::Identity::new(),
            };
            commands::play::run(&app, &identity, &category, no_speech, &cli.format, use_color)
                .await?;
        }
    }

    Ok(())
}
