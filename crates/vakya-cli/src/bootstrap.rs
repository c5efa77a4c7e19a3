//! Composition root: wires concrete adapters into a `SpeechSequencer`.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use vakya_core::VoiceSettings;
use vakya_voice::backend::{CommandPlayer, EspeakSpeech, GeminiConfig, GeminiSynthesizer};
use vakya_voice::{AudioPlayer, SpeechBackends, SpeechSequencer, VoiceEvent};

use crate::parser::PlayerArg;

/// Build the audio player selected on the command line.
pub fn build_player(choice: PlayerArg) -> anyhow::Result<Arc<dyn AudioPlayer>> {
    match choice {
        PlayerArg::Ffplay => Ok(Arc::new(CommandPlayer::ffplay())),
        PlayerArg::Aplay => Ok(Arc::new(CommandPlayer::aplay())),
        PlayerArg::Rodio => rodio_player(),
    }
}

#[cfg(feature = "rodio")]
fn rodio_player() -> anyhow::Result<Arc<dyn AudioPlayer>> {
    let player = vakya_voice::backend::RodioPlayer::new().context("Failed to open audio output")?;
    Ok(Arc::new(player))
}

#[cfg(not(feature = "rodio"))]
fn rodio_player() -> anyhow::Result<Arc<dyn AudioPlayer>> {
    anyhow::bail!("this build has no in-process audio; rebuild with --features rodio")
}

/// Create a sequencer with the production adapters.
pub fn build_sequencer(
    settings: VoiceSettings,
    player: PlayerArg,
) -> anyhow::Result<(SpeechSequencer, mpsc::UnboundedReceiver<VoiceEvent>)> {
    let synthesizer = GeminiSynthesizer::new(GeminiConfig::from_env(&settings))
        .context("Failed to create speech synthesizer")?;

    let backends = SpeechBackends {
        synthesizer: Arc::new(synthesizer),
        local: Arc::new(EspeakSpeech::detect()),
        player: build_player(player)?,
    };

    Ok(SpeechSequencer::new(settings, backends))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_players_build_without_devices() {
        assert!(build_player(PlayerArg::Ffplay).is_ok());
        assert!(build_player(PlayerArg::Aplay).is_ok());
    }

    #[cfg(not(feature = "rodio"))]
    #[test]
    fn rodio_requires_feature() {
        let err = build_player(PlayerArg::Rodio).err().unwrap();
        assert!(err.to_string().contains("--features rodio"));
    }
}
