//! # vakya-core
//!
//! Domain settings and port definitions shared by the vakya crates.
//!
//! This crate has no infrastructure dependencies: the speech synthesis
//! service, audio devices and the filesystem layout are all provided by
//! adapters in other crates.

#![deny(unused_crate_dependencies)]

pub mod ports;
pub mod settings;

pub use ports::{SpeechSynthesizer, SynthesisError};
pub use settings::{
    DEFAULT_AUTO_LOCAL_THRESHOLD, DEFAULT_LOCALE, DEFAULT_MAX_CHUNK_CHARS,
    DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_SPEED, DEFAULT_TTS_MODEL, DEFAULT_VOICE_NAME,
    MAX_SPEED, MIN_SPEED, SettingsError, VoiceSettings, VoiceSettingsUpdate, clamp_speed,
    validate_settings,
};
