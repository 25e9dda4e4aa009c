//! Text-to-speech capability used to read a card's prompt aloud.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech output is not available")]
    Unavailable,

    #[error("Failed to start speech program: {0}")]
    Io(#[from] std::io::Error),
}

pub trait SpeechOutput: Send + Sync {
    /// Whether this platform can speak at all
    fn is_available(&self) -> bool;

    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// For platforms without speech support
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpeech;

impl SpeechOutput for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable)
    }
}

/// Programs tried in order when detecting a system synthesizer
const SPEECH_PROGRAMS: &[&str] = &["say", "espeak-ng", "espeak", "spd-say"];

/// Speaks through the first synthesizer program found on `PATH`
#[derive(Debug, Clone)]
pub struct SystemSpeech {
    program: Option<PathBuf>,
}

impl SystemSpeech {
    pub fn detect() -> Self {
        let program = env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths).find_map(|dir| find_program(&dir))
        });

        match &program {
            Some(path) => log::debug!("Using speech program {}", path.display()),
            None => log::debug!("No speech program found on PATH"),
        }

        Self { program }
    }
}

fn find_program(dir: &Path) -> Option<PathBuf> {
    SPEECH_PROGRAMS
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

impl SpeechOutput for SystemSpeech {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let program = self.program.as_ref().ok_or(SpeechError::Unavailable)?;
        Command::new(program)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}
