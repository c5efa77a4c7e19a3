//! Local (on-device) speech capability.
//!
//! The sequencer only talks to [`LocalSpeech`]. The platform adapter lives in
//! [`crate::backend::espeak`]; tests use a synchronous double.

use crate::error::VoiceError;

/// Lifecycle notifications from the device voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSpeechEvent {
    /// The device started speaking the utterance.
    Started,

    /// The utterance finished normally.
    Ended,

    /// The device gave up on the utterance.
    Failed(String),
}

/// Receives [`LocalSpeechEvent`]s for one utterance.
///
/// May be invoked from any thread, and may be invoked synchronously from
/// inside [`LocalSpeech::enqueue`].
pub type LocalSpeechCallback = Box<dyn Fn(LocalSpeechEvent) + Send + Sync + 'static>;

/// One utterance for the device voice.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalUtterance {
    /// Text to speak, unmodified.
    pub text: String,

    /// Rate multiplier (1.0 = normal).
    pub rate: f32,

    /// BCP-47 locale of the voice to use, e.g. `hi-IN`.
    pub locale: String,
}

/// Abstraction over a device speech synthesizer.
///
/// The platform convention is one utterance at a time: callers must
/// [`cancel`](LocalSpeech::cancel) before enqueueing a new one.
pub trait LocalSpeech: Send + Sync {
    /// Whether a speech facility exists on this system at all.
    fn is_available(&self) -> bool;

    /// Queue an utterance. Returns once it is queued, not when it is spoken.
    fn enqueue(
        &self,
        utterance: LocalUtterance,
        on_event: LocalSpeechCallback,
    ) -> Result<(), VoiceError>;

    /// Drop the current utterance and anything still queued.
    fn cancel(&self);
}
