//! Audio playback through an external player process.
//!
//! The clip's WAV bytes are piped to the player's stdin; the clip ends when
//! the process exits. The default player is `ffplay` because its `atempo`
//! filter covers exactly the supported 0.5–2.0 rate range.

use tokio::process::Command;

use crate::error::VoiceError;
use crate::player::{AudioPlayer, PlaybackCompletion, PlaybackEnd};
use crate::resource::AudioResource;

use super::process::ChildSlot;

/// Placeholder in player arguments replaced by the playback rate.
pub const RATE_PLACEHOLDER: &str = "{rate}";

/// [`AudioPlayer`] that runs one player process per clip.
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    slot: ChildSlot,
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::ffplay()
    }
}

impl CommandPlayer {
    /// A player command. `{rate}` in any argument is replaced per clip.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            slot: ChildSlot::default(),
        }
    }

    /// `ffplay` reading WAV from stdin with tempo adjustment.
    #[must_use]
    pub fn ffplay() -> Self {
        Self::new(
            "ffplay",
            [
                "-nodisp",
                "-autoexit",
                "-loglevel",
                "quiet",
                "-af",
                "atempo={rate}",
                "-i",
                "-",
            ]
            .map(String::from)
            .to_vec(),
        )
    }

    /// ALSA `aplay`. Ignores the playback rate.
    #[must_use]
    pub fn aplay() -> Self {
        Self::new("aplay", ["-q", "-"].map(String::from).to_vec())
    }

    /// Pick a player by name (`ffplay`, `aplay`), or run `name` as given
    /// with no arguments other than `-` for stdin.
    #[must_use]
    pub fn named(name: &str) -> Self {
        match name {
            "ffplay" => Self::ffplay(),
            "aplay" => Self::aplay(),
            other => Self::new(other, vec!["-".to_string()]),
        }
    }

    /// Whether a clip is still playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.slot.is_running()
    }

    fn args_for_rate(&self, rate: f32) -> Vec<String> {
        let rate = format!("{:.2}", vakya_core::clamp_speed(rate));
        self.args
            .iter()
            .map(|arg| arg.replace(RATE_PLACEHOLDER, &rate))
            .collect()
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, clip: &AudioResource, rate: f32) -> Result<PlaybackCompletion, VoiceError> {
        self.halt();

        let bytes = clip.bytes()?;
        let size = bytes.len();
        let mut command = Command::new(&self.program);
        command.args(self.args_for_rate(rate));
        let child = self
            .slot
            .spawn(&mut command, Some(bytes))
            .map_err(|e| VoiceError::Playback(format!("failed to launch {}: {e}", self.program)))?;

        tracing::debug!(
            program = %self.program,
            pid = ?child.id(),
            clip = %clip.uri(),
            bytes = size,
            "Player started"
        );

        let (notifier, completion) = PlaybackCompletion::channel();
        self.slot.watch(child, move |exit| {
            let end = match exit {
                Ok(status) if status.success() => PlaybackEnd::Finished,
                Ok(status) => PlaybackEnd::Failed(format!("player exited with {status}")),
                Err(e) => PlaybackEnd::Failed(e.to_string()),
            };
            notifier.notify(end);
        });

        Ok(completion)
    }

    fn halt(&self) {
        if self.slot.kill() {
            tracing::debug!(program = %self.program, "Player halted");
        }
    }
}
