//! Command handlers.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tokio::sync::mpsc;
use vakya_core::{VoiceSettings, VoiceSettingsUpdate};
use vakya_voice::{SpeechSequencer, VoiceEvent, chunk_for_speech};

use crate::bootstrap;
use crate::parser::{ConfigSetArgs, SpeakArgs};

/// Use `arg` unless it is missing or `-`, in which case read all of stdin.
pub fn read_text(arg: Option<String>, mut stdin: impl Read) -> anyhow::Result<String> {
    match arg {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut text = String::new();
            stdin
                .read_to_string(&mut text)
                .context("Failed to read text from stdin")?;
            Ok(text)
        }
    }
}

/// `vakya speak`
pub async fn handle_speak(settings: VoiceSettings, args: SpeakArgs) -> anyhow::Result<()> {
    let text = read_text(args.text, std::io::stdin())?;
    let (sequencer, mut events) = bootstrap::build_sequencer(settings, args.player)?;

    if let Some(speed) = args.speed {
        sequencer.set_speed(speed);
    }

    sequencer.speak(&text, args.kind.into(), args.id.as_deref());
    wait_until_idle(&sequencer, &mut events).await;
    Ok(())
}

/// Follow events until the session ends or the user presses Ctrl-C.
async fn wait_until_idle(sequencer: &SpeechSequencer, events: &mut mpsc::UnboundedReceiver<VoiceEvent>) {
    if !sequencer.is_speaking() {
        report_pending(events);
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(VoiceEvent::StatusChanged(status)) if !status.is_speaking => break,
                Some(event) => report(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping playback");
                sequencer.stop();
                break;
            }
        }
    }
}

fn report_pending(events: &mut mpsc::UnboundedReceiver<VoiceEvent>) {
    while let Ok(event) = events.try_recv() {
        report(&event);
    }
}

fn report(event: &VoiceEvent) {
    match event {
        VoiceEvent::ChunkStarted { index, total, .. } => {
            tracing::info!(chunk = index + 1, total, "Playing");
        }
        VoiceEvent::ChunkSkipped { index, reason, .. } => {
            tracing::warn!(chunk = index + 1, %reason, "Chunk skipped");
        }
        VoiceEvent::LocalSpeechUnsupported => {
            eprintln!("Local speech is not supported on this system (install espeak-ng).");
        }
        _ => tracing::debug!(?event, "Voice event"),
    }
}

/// `vakya chunks`
pub fn handle_chunks(settings: &VoiceSettings, text: Option<String>) -> anyhow::Result<()> {
    let text = read_text(text, std::io::stdin())?;
    for (index, chunk) in chunk_for_speech(&text, settings.max_chunk_chars)
        .iter()
        .enumerate()
    {
        println!("[{}] ({} chars) {chunk}", index + 1, chunk.chars().count());
    }
    Ok(())
}

/// `vakya config show`
pub fn handle_config_show(settings: &VoiceSettings) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

/// `vakya config set`
pub fn handle_config_set(
    path: &Path,
    mut settings: VoiceSettings,
    args: ConfigSetArgs,
) -> anyhow::Result<VoiceSettings> {
    let update = VoiceSettingsUpdate {
        speed: args.speed,
        auto_read: args.auto_read,
        locale: args.locale,
        voice_name: args.voice_name,
        tts_model: args.tts_model,
        max_chunk_chars: args.max_chunk_chars,
        auto_local_threshold: args.auto_local_threshold,
        max_consecutive_failures: if args.no_failure_cap {
            Some(None)
        } else {
            args.max_failures.map(Some)
        },
    };

    settings.merge(&update);
    settings
        .save(path)
        .with_context(|| format!("Failed to save settings to {}", path.display()))?;

    tracing::info!(path = %path.display(), "Voice settings saved");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_argument_wins_over_stdin() {
        let text = read_text(Some("om".into()), "ignored".as_bytes()).unwrap();
        assert_eq!(text, "om");
    }

    #[test]
    fn dash_and_missing_read_stdin() {
        assert_eq!(read_text(Some("-".into()), "from stdin".as_bytes()).unwrap(), "from stdin");
        assert_eq!(read_text(None, "piped".as_bytes()).unwrap(), "piped");
    }

    #[test]
    fn config_set_persists_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");

        let args = ConfigSetArgs {
            speed: Some(1.25),
            no_failure_cap: true,
            ..ConfigSetArgs::default()
        };
        let saved = handle_config_set(&path, VoiceSettings::default(), args).unwrap();
        assert_eq!(saved.max_consecutive_failures, None);

        let loaded = VoiceSettings::load(&path).unwrap();
        assert!((loaded.speed - 1.25).abs() < f32::EPSILON);
        assert_eq!(loaded.max_consecutive_failures, None);

        let bad = ConfigSetArgs {
            speed: Some(3.0),
            ..ConfigSetArgs::default()
        };
        assert!(handle_config_set(&path, loaded, bad).is_err());
        assert!((VoiceSettings::load(&path).unwrap().speed - 1.25).abs() < f32::EPSILON);
    }
}
