//! Device voice through the `espeak-ng` command line synthesizer.
//!
//! Each utterance runs as one `espeak-ng` process that plays straight to the
//! default audio device. Cancelling kills the process.

use tokio::process::Command;

use crate::error::VoiceError;
use crate::local::{LocalSpeech, LocalSpeechCallback, LocalSpeechEvent, LocalUtterance};

use super::process::{ChildSlot, program_exists};

/// Programs tried, in order, when no explicit binary is configured.
pub const ESPEAK_CANDIDATES: [&str; 2] = ["espeak-ng", "espeak"];

/// Environment variable naming an explicit espeak binary.
pub const ESPEAK_BIN_ENV: &str = "ESPEAK_BIN";

/// espeak's default speaking rate in words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// [`LocalSpeech`] backed by an espeak process.
pub struct EspeakSpeech {
    program: Option<String>,
    slot: ChildSlot,
}

impl EspeakSpeech {
    /// Use `$ESPEAK_BIN`, or the first of [`ESPEAK_CANDIDATES`] that runs.
    ///
    /// When nothing is found the adapter reports itself unavailable rather
    /// than failing.
    #[must_use]
    pub fn detect() -> Self {
        let program = std::env::var(ESPEAK_BIN_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .into_iter()
            .chain(ESPEAK_CANDIDATES.iter().map(ToString::to_string))
            .find(|p| program_exists(p));

        match &program {
            Some(p) => tracing::info!(program = %p, "Local speech via espeak"),
            None => tracing::warn!("No espeak binary found, local speech unavailable"),
        }

        Self::with_program(program)
    }

    /// Use a specific binary, or none at all.
    #[must_use]
    pub fn with_program(program: Option<String>) -> Self {
        Self {
            program,
            slot: ChildSlot::default(),
        }
    }
}

impl LocalSpeech for EspeakSpeech {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn enqueue(
        &self,
        utterance: LocalUtterance,
        on_event: LocalSpeechCallback,
    ) -> Result<(), VoiceError> {
        let program = self
            .program
            .as_deref()
            .ok_or(VoiceError::LocalSpeechUnsupported)?;

        let mut command = Command::new(program);
        command.args(espeak_args(&utterance));
        let child = self
            .slot
            .spawn(&mut command, None)
            .map_err(|e| VoiceError::LocalSpeech(format!("failed to launch {program}: {e}")))?;

        tracing::debug!(
            program,
            pid = ?child.id(),
            chars = utterance.text.chars().count(),
            "Local utterance started"
        );
        on_event(LocalSpeechEvent::Started);

        self.slot.watch(child, move |exit| match exit {
            Ok(status) if status.success() => on_event(LocalSpeechEvent::Ended),
            Ok(status) => on_event(LocalSpeechEvent::Failed(format!("espeak exited with {status}"))),
            Err(e) => on_event(LocalSpeechEvent::Failed(e.to_string())),
        });
        Ok(())
    }

    fn cancel(&self) {
        if self.slot.kill() {
            tracing::debug!("Local utterance cancelled");
        }
    }
}

/// Command line for one utterance.
fn espeak_args(utterance: &LocalUtterance) -> Vec<String> {
    vec![
        "-v".to_string(),
        voice_for_locale(&utterance.locale),
        "-s".to_string(),
        words_per_minute(utterance.rate).to_string(),
        "--".to_string(),
        utterance.text.clone(),
    ]
}

/// espeak voices are named by bare language code (`hi`, `vi`, `en`).
fn voice_for_locale(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .filter(|lang| !lang.is_empty())
        .unwrap_or("en")
        .to_ascii_lowercase()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn words_per_minute(rate: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * vakya_core::clamp_speed(rate)).round() as u32
}
