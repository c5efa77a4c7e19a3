//! # vakya-voice
//!
//! Speech playback for vakya: a sequencer that speaks short items with the
//! device voice and longer replies through a networked synthesizer, one
//! ordered session at a time.
//!
//! ```text
//!   SpeechSequencer ──► LocalSpeech   (espeak)
//!         │        ──► SpeechSynthesizer (Gemini) ──► AudioStore ──► AudioPlayer (ffplay / rodio)
//!         └──► VoiceEvent channel
//! ```

#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod error;
pub mod local;
pub mod player;
pub mod resource;
pub mod selector;
pub mod sequencer;
pub mod text_utils;
pub mod wav;

// Re-export key types for convenience
pub use error::VoiceError;
pub use local::{LocalSpeech, LocalSpeechCallback, LocalSpeechEvent, LocalUtterance};
pub use player::{AudioPlayer, PlaybackCompletion, PlaybackEnd, PlaybackNotifier};
pub use resource::{AudioResource, AudioStore};
pub use selector::{AudioKind, SpeechBackend, select, select_with_threshold};
pub use sequencer::{
    PlaybackStatus, SpeechBackends, SpeechSequencer, VoiceEvent, VoiceParameters,
};
pub use text_utils::chunk_for_speech;
pub use wav::pcm16_to_wav;
