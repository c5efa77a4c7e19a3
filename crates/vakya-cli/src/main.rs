//! CLI entry point - the composition root.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vakya_cli::{Cli, Command, ConfigCommand, handlers};
use vakya_core::VoiceSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (GEMINI_API_KEY, VAKYA_*)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = VoiceSettings::load(&cli.settings)?;

    match cli.command {
        Command::Speak(args) => handlers::handle_speak(settings, args).await,
        Command::Chunks { text } => handlers::handle_chunks(&settings, text),
        Command::Config(ConfigCommand::Show) => handlers::handle_config_show(&settings),
        Command::Config(ConfigCommand::Set(args)) => {
            handlers::handle_config_set(&cli.settings, settings, args).map(|_| ())
        }
    }
}
