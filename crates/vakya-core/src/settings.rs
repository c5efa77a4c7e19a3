//! Voice settings domain types and validation.
//!
//! These are the user-facing knobs from the settings screen (reading speed,
//! auto-read) plus the tuning values the playback sequencer needs. They are
//! plain serde types; the JSON file helpers at the bottom are the only I/O.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Slowest allowed playback rate.
pub const MIN_SPEED: f32 = 0.5;

/// Fastest allowed playback rate.
pub const MAX_SPEED: f32 = 2.0;

/// Normal reading speed, also used in place of a non-finite rate.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Locale of the target learning language, used by the local voice.
pub const DEFAULT_LOCALE: &str = "hi-IN";

/// Prebuilt voice requested from the networked synthesizer.
pub const DEFAULT_VOICE_NAME: &str = "Fenrir";

/// Model used for networked speech synthesis.
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Maximum characters per networked synthesis chunk.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 500;

/// `Auto` requests shorter than this many characters use the local voice.
pub const DEFAULT_AUTO_LOCAL_THRESHOLD: usize = 30;

/// Consecutive failed chunks after which a networked session gives up.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Voice and playback settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceSettings {
    /// Playback rate multiplier applied to both backends (0.5–2.0).
    pub speed: f32,

    /// Whether AI replies are read aloud automatically.
    pub auto_read: bool,

    /// BCP-47 locale for the local voice.
    pub locale: String,

    /// Prebuilt voice name for the networked synthesizer.
    pub voice_name: String,

    /// Networked synthesis model identifier.
    pub tts_model: String,

    /// Maximum characters per networked chunk.
    pub max_chunk_chars: usize,

    /// Length below which `Auto` requests go to the local voice.
    pub auto_local_threshold: usize,

    /// Abort a networked session after this many chunk failures in a row.
    /// `None` keeps skipping until the text runs out.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            auto_read: true,
            locale: DEFAULT_LOCALE.to_string(),
            voice_name: DEFAULT_VOICE_NAME.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            auto_local_threshold: DEFAULT_AUTO_LOCAL_THRESHOLD,
            max_consecutive_failures: Some(DEFAULT_MAX_CONSECUTIVE_FAILURES),
        }
    }
}

impl VoiceSettings {
    /// Speed clamped into the supported range.
    #[must_use]
    pub fn effective_speed(&self) -> f32 {
        clamp_speed(self.speed)
    }

    /// Merge a partial update, only touching fields that are `Some`.
    pub fn merge(&mut self, update: &VoiceSettingsUpdate) {
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(auto_read) = update.auto_read {
            self.auto_read = auto_read;
        }
        if let Some(ref locale) = update.locale {
            self.locale.clone_from(locale);
        }
        if let Some(ref voice) = update.voice_name {
            self.voice_name.clone_from(voice);
        }
        if let Some(ref model) = update.tts_model {
            self.tts_model.clone_from(model);
        }
        if let Some(max) = update.max_chunk_chars {
            self.max_chunk_chars = max;
        }
        if let Some(threshold) = update.auto_local_threshold {
            self.auto_local_threshold = threshold;
        }
        if let Some(cap) = update.max_consecutive_failures {
            self.max_consecutive_failures = cap;
        }
    }

    /// Load settings from a JSON file.
    ///
    /// A missing file yields defaults; a present but unreadable or invalid
    /// file is an error.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No voice settings file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        let settings: Self =
            serde_json::from_str(&raw).map_err(|e| SettingsError::Parse(e.to_string()))?;
        validate_settings(&settings)?;

        tracing::debug!(path = %path.display(), "Loaded voice settings");
        Ok(settings)
    }

    /// Validate and write settings to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        validate_settings(self)?;
        let raw =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, raw).map_err(|e| SettingsError::Io(e.to_string()))
    }
}

/// Clamp a playback rate into `MIN_SPEED..=MAX_SPEED`. NaN and infinities
/// become [`DEFAULT_SPEED`].
#[must_use]
pub fn clamp_speed(speed: f32) -> f32 {
    if speed.is_finite() {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    } else {
        DEFAULT_SPEED
    }
}

/// Partial settings update.
///
/// `None` leaves a field unchanged. `max_consecutive_failures` is doubly
/// optional so that the cap itself can be cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceSettingsUpdate {
    pub speed: Option<f32>,
    pub auto_read: Option<bool>,
    pub locale: Option<String>,
    pub voice_name: Option<String>,
    pub tts_model: Option<String>,
    pub max_chunk_chars: Option<usize>,
    pub auto_local_threshold: Option<usize>,
    pub max_consecutive_failures: Option<Option<u32>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Speed must be between 0.5 and 2.0, got {0}")]
    InvalidSpeed(f32),

    #[error("Chunk size must be at least 1 character")]
    ZeroChunkSize,

    #[error("Locale cannot be empty")]
    EmptyLocale,

    #[error("Failure cap must be at least 1 when set")]
    ZeroFailureCap,

    #[error("Failed to read or write settings: {0}")]
    Io(String),

    #[error("Invalid settings file: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &VoiceSettings) -> Result<(), SettingsError> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&settings.speed) {
        return Err(SettingsError::InvalidSpeed(settings.speed));
    }

    if settings.max_chunk_chars == 0 {
        return Err(SettingsError::ZeroChunkSize);
    }

    if settings.locale.trim().is_empty() {
        return Err(SettingsError::EmptyLocale);
    }

    if settings.max_consecutive_failures == Some(0) {
        return Err(SettingsError::ZeroFailureCap);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = VoiceSettings::default();
        assert!((settings.speed - 1.0).abs() < f32::EPSILON);
        assert!(settings.auto_read);
        assert_eq!(settings.locale, "hi-IN");
        assert_eq!(settings.voice_name, "Fenrir");
        assert_eq!(settings.max_chunk_chars, 500);
        assert_eq!(settings.auto_local_threshold, 30);
        assert_eq!(settings.max_consecutive_failures, Some(3));
    }

    #[test]
    fn test_validate_settings_valid() {
        assert!(validate_settings(&VoiceSettings::default()).is_ok());
    }

    #[test]
    fn test_validate_speed_out_of_range() {
        let settings = VoiceSettings {
            speed: 2.5,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_validate_zero_chunk_size() {
        let settings = VoiceSettings {
            max_chunk_chars: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::ZeroChunkSize)
        ));
    }

    #[test]
    fn test_validate_empty_locale() {
        let settings = VoiceSettings {
            locale: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyLocale)
        ));
    }

    #[test]
    fn test_effective_speed_is_clamped() {
        let settings = VoiceSettings {
            speed: 9.0,
            ..Default::default()
        };
        assert!((settings.effective_speed() - MAX_SPEED).abs() < f32::EPSILON);
        assert!((clamp_speed(0.1) - MIN_SPEED).abs() < f32::EPSILON);
    }

    #[test]
    fn test_non_finite_speed_falls_back_to_default() {
        assert!((clamp_speed(f32::NAN) - DEFAULT_SPEED).abs() < f32::EPSILON);
        assert!((clamp_speed(f32::INFINITY) - DEFAULT_SPEED).abs() < f32::EPSILON);
        assert!((clamp_speed(f32::NEG_INFINITY) - DEFAULT_SPEED).abs() < f32::EPSILON);

        let settings = VoiceSettings {
            speed: f32::NAN,
            ..VoiceSettings::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_merge_only_touches_some_fields() {
        let mut settings = VoiceSettings::default();
        settings.merge(&VoiceSettingsUpdate {
            speed: Some(1.5),
            max_consecutive_failures: Some(None),
            ..Default::default()
        });

        assert!((settings.speed - 1.5).abs() < f32::EPSILON);
        assert_eq!(settings.max_consecutive_failures, None);
        assert!(settings.auto_read);
        assert_eq!(settings.voice_name, DEFAULT_VOICE_NAME);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = VoiceSettings::load(&dir.path().join("voice.json")).unwrap();
        assert_eq!(settings, VoiceSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");

        let settings = VoiceSettings {
            speed: 0.8,
            auto_read: false,
            ..Default::default()
        };
        settings.save(&path).unwrap();

        let loaded = VoiceSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");
        std::fs::write(&path, r#"{ "speed": 1.2 }"#).unwrap();

        let loaded = VoiceSettings::load(&path).unwrap();
        assert!((loaded.speed - 1.2).abs() < f32::EPSILON);
        assert_eq!(loaded.locale, DEFAULT_LOCALE);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");
        std::fs::write(&path, r#"{ "speed": 7.0 }"#).unwrap();

        assert!(matches!(
            VoiceSettings::load(&path),
            Err(SettingsError::InvalidSpeed(_))
        ));
    }
}
