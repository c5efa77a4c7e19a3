//! Voice playback error types.

use vakya_core::SynthesisError;

/// Errors that can occur while preparing or playing speech.
///
/// None of these are fatal to the process. Per-chunk errors are logged and
/// the chunk is skipped; the public `speak`/`stop` entry points never return
/// them.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The networked synthesizer failed for a chunk.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The synthesizer payload was not valid base64.
    #[error("Invalid base64 audio payload: {0}")]
    InvalidAudioPayload(String),

    /// The platform has no local speech synthesis facility.
    #[error("Local speech synthesis is not supported on this system")]
    LocalSpeechUnsupported,

    /// The local speech engine failed to start an utterance.
    #[error("Local speech failed: {0}")]
    LocalSpeech(String),

    /// Failed to open the audio output.
    #[error("Failed to open audio output: {0}")]
    OutputStreamError(String),

    /// The audio player rejected or failed a clip.
    #[error("Audio playback failed: {0}")]
    Playback(String),

    /// The audio resource was already revoked from its store.
    #[error("Audio resource {0} is no longer available")]
    ResourceRevoked(u64),

    /// No async runtime is available to drive networked playback.
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    /// IO error (player or speech subprocesses).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
