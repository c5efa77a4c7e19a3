//! Networked speech synthesis port.

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by [`SpeechSynthesizer`] implementations.
///
/// Every variant is recoverable from the caller's point of view: the
/// sequencer skips the affected chunk and moves on.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The adapter has no credentials or endpoint configured.
    #[error("Speech synthesis is not configured: {0}")]
    NotConfigured(String),

    /// The request could not be delivered or the connection dropped.
    #[error("Speech synthesis request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Speech synthesis service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("Malformed speech synthesis response: {0}")]
    InvalidResponse(String),
}

/// Remote text-to-speech service.
///
/// Implementations turn a single chunk of plain text into raw audio. The
/// returned payload is base64-encoded little-endian 16-bit mono PCM; `None`
/// means the service answered successfully but produced no audio.
///
/// Callers never retry: a failed or empty chunk is dropped.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return base64 PCM, or `None` when no audio was
    /// produced.
    async fn synthesize(&self, text: &str) -> Result<Option<String>, SynthesisError>;

    /// Sample rate (Hz) of the PCM this synthesizer returns.
    fn sample_rate(&self) -> u32;
}
