use std::time::Duration;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use flashnest_lib::catalog;
use flashnest_lib::identity::Identity;
use flashnest_lib::session::{ReplayOutcome, SessionController, SessionPhase};
use flashnest_lib::speech::{NoSpeech, SpeechOutput, SystemSpeech};

use crate::app::App;
use crate::render::terminal::{render_card, render_reveal, render_warning};
use crate::OutputFormat;

/// How long a card waits for its image before showing without one
const IMAGE_WAIT: Duration = Duration::from_millis(1500);

type Input = Lines<BufReader<Stdin>>;

pub async fn run(
    app: &App,
    identity: &Identity,
    category: &str,
    no_speech: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let category = catalog::resolve(category);
    if category.is_empty() {
        bail!("Category must not be empty");
    }

    let speech: Box<dyn SpeechOutput> = if no_speech {
        Box::new(NoSpeech)
    } else {
        Box::new(SystemSpeech::detect())
    };

    let mut session = SessionController::new(
        category,
        identity.uid().map(str::to_string),
        app.services.clone(),
    );
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if identity.uid().is_none() {
        eprintln!("{}", render_warning("Playing without a user, the score will not be saved.", use_color));
    }
    eprintln!(
        "Generating {} cards for {}...",
        app.config.settings.deck_size,
        session.category()
    );
    session.start().await;

    let mut show_card = true;
    loop {
        match session.phase().clone() {
            SessionPhase::Loading => bail!("Session did not start"),
            SessionPhase::Failed(err) => {
                emit(&session, format, || {
                    render_warning(&format!("Could not create a deck: {}", err), use_color)
                });
                match read_line(&mut input, "r to retry, q to quit").await?.as_deref() {
                    Some("r") => {
                        session.retry().await;
                        show_card = true;
                    }
                    _ => break,
                }
            }
            SessionPhase::AwaitingAnswer => {
                if show_card {
                    let _ = tokio::time::timeout(IMAGE_WAIT, session.settle_image()).await;
                    emit(&session, format, || render_card(&session.snapshot(), use_color));
                }
                show_card = true;

                let Some(line) =
                    read_line(&mut input, "pick 1-4, s to speak, n for a new deck, q to quit")
                        .await?
                else {
                    break;
                };

                match line.as_str() {
                    "q" => break,
                    "s" => {
                        if session.replay_audio(speech.as_ref()) == ReplayOutcome::Unavailable {
                            eprintln!("{}", render_warning("Speech is not available.", use_color));
                        }
                        show_card = false;
                    }
                    "n" => {
                        eprintln!("Generating a new deck...");
                        session.regenerate().await;
                    }
                    choice => match pick_option(&session, choice) {
                        Some(option) => {
                            if let Some(answer) = session.select_option(&option) {
                                emit(&session, format, || {
                                    render_reveal(&session.snapshot(), answer.correct, use_color)
                                });
                            }
                        }
                        None => {
                            eprintln!("{}", render_warning("Pick one of the numbered options.", use_color));
                            show_card = false;
                        }
                    },
                }
            }
            SessionPhase::Revealed => {
                match read_line(&mut input, "Enter for the next card, q to quit")
                    .await?
                    .as_deref()
                {
                    None | Some("q") => break,
                    Some(_) => {
                        session.advance();
                    }
                }
            }
            SessionPhase::Finished { final_score } => {
                emit(&session, format, || {
                    format!("Deck complete! Final score: {}", final_score)
                });
                break;
            }
        }
    }

    let report = session.flush().await;
    log::debug!("Flushed scores: {:?}", report);
    if session.persistence_degraded() {
        eprintln!(
            "{}",
            render_warning("Some points could not be saved and were kept for this session only.", use_color)
        );
    }

    Ok(())
}

/// Print plain text, or the session snapshot as one JSON line
fn emit<F>(session: &SessionController, format: &OutputFormat, plain: F)
where
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Plain => println!("{}\n", plain()),
        OutputFormat::Json => match serde_json::to_string(&session.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize session: {}", e),
        },
    }
}

/// Option chosen by number or by its text
fn pick_option(session: &SessionController, choice: &str) -> Option<String> {
    let options = session.current_card()?.options();

    if let Ok(n) = choice.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).cloned();
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(choice))
        .cloned()
}

async fn read_line(input: &mut Input, hint: &str) -> Result<Option<String>> {
    eprintln!("[{}]", hint);
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}
