//! Command-line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vakya_voice::AudioKind;

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "vakya-voice.json";

/// Speak Sanskrit and Vietnamese study text aloud.
#[derive(Parser)]
#[command(name = "vakya")]
#[command(about = "Speak lesson text with a local or networked voice")]
#[command(version)]
pub struct Cli {
    /// Voice settings file (JSON)
    #[arg(
        long,
        global = true,
        env = "VAKYA_SETTINGS",
        default_value = DEFAULT_SETTINGS_PATH
    )]
    pub settings: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Speak text and wait until playback ends
    Speak(SpeakArgs),

    /// Print the chunks networked speech would synthesize, without speaking
    Chunks {
        /// Text to chunk; reads stdin when omitted or `-`
        text: Option<String>,
    },

    /// Show or change voice settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
pub struct SpeakArgs {
    /// Text to speak; reads stdin when omitted or `-`
    pub text: Option<String>,

    /// What kind of text this is (decides local vs networked voice)
    #[arg(short, long, value_enum, default_value_t = KindArg::Auto)]
    pub kind: KindArg,

    /// Playback speed for this invocation (0.5–2.0)
    #[arg(short, long)]
    pub speed: Option<f32>,

    /// Marker id reported while a local utterance plays
    #[arg(long)]
    pub id: Option<String>,

    /// Audio player for networked speech
    #[arg(long, value_enum, env = "VAKYA_PLAYER", default_value_t = PlayerArg::Ffplay)]
    pub player: PlayerArg,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings as JSON
    Show,

    /// Update settings and save them
    Set(ConfigSetArgs),
}

#[derive(Args, Default)]
pub struct ConfigSetArgs {
    #[arg(long)]
    pub speed: Option<f32>,

    #[arg(long)]
    pub auto_read: Option<bool>,

    /// Locale of the local voice, e.g. hi-IN
    #[arg(long)]
    pub locale: Option<String>,

    /// Prebuilt voice of the networked synthesizer
    #[arg(long)]
    pub voice_name: Option<String>,

    #[arg(long)]
    pub tts_model: Option<String>,

    #[arg(long)]
    pub max_chunk_chars: Option<usize>,

    /// Auto-kind texts shorter than this use the local voice
    #[arg(long)]
    pub auto_local_threshold: Option<usize>,

    /// Give up after this many failed chunks in a row
    #[arg(long, conflicts_with = "no_failure_cap")]
    pub max_failures: Option<u32>,

    /// Never give up on failed chunks
    #[arg(long)]
    pub no_failure_cap: bool,
}

/// Command-line spelling of [`AudioKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Auto,
    System,
    Vocab,
}

impl From<KindArg> for AudioKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Auto => Self::Auto,
            KindArg::System => Self::System,
            KindArg::Vocab => Self::Vocab,
        }
    }
}

/// Available audio players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlayerArg {
    Ffplay,
    Aplay,
    /// In-process output (requires the `rodio` feature)
    Rodio,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_speak_args() {
        let cli = Cli::parse_from([
            "vakya", "speak", "namaste", "--kind", "vocab", "--speed", "1.5", "--id", "w1",
        ]);
        let Command::Speak(args) = cli.command else {
            panic!("expected speak");
        };
        assert_eq!(args.text.as_deref(), Some("namaste"));
        assert_eq!(AudioKind::from(args.kind), AudioKind::Vocab);
        assert_eq!(args.speed, Some(1.5));
        assert_eq!(args.id.as_deref(), Some("w1"));
    }

    #[test]
    fn test_global_settings_path() {
        let cli = Cli::parse_from(["vakya", "config", "show", "--settings", "/tmp/v.json"]);
        assert_eq!(cli.settings, PathBuf::from("/tmp/v.json"));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Show)));
    }

    #[test]
    fn test_failure_cap_flags_conflict() {
        let result = Cli::try_parse_from([
            "vakya",
            "config",
            "set",
            "--max-failures",
            "2",
            "--no-failure-cap",
        ]);
        assert!(result.is_err());
    }
}
