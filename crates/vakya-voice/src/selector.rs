//! Speech backend selection.

use serde::{Deserialize, Serialize};

pub use vakya_core::DEFAULT_AUTO_LOCAL_THRESHOLD;

/// What kind of text a speak request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AudioKind {
    /// Pick by length.
    #[default]
    Auto,

    /// An AI-generated reply that deserves narrated, expressive speech.
    System,

    /// A single vocabulary word where latency matters more than prosody.
    Vocab,
}

/// The two speech backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeechBackend {
    /// On-device voice.
    Local,

    /// Remote synthesis service.
    Networked,
}

/// Choose a backend using the default `Auto` threshold of 30 characters.
#[must_use]
pub const fn select(kind: AudioKind, text_len: usize) -> SpeechBackend {
    select_with_threshold(kind, text_len, DEFAULT_AUTO_LOCAL_THRESHOLD)
}

/// Choose a backend: `System` is always networked, `Vocab` always local,
/// and `Auto` is local only below `threshold` characters.
#[must_use]
pub const fn select_with_threshold(
    kind: AudioKind,
    text_len: usize,
    threshold: usize,
) -> SpeechBackend {
    match kind {
        AudioKind::System => SpeechBackend::Networked,
        AudioKind::Vocab => SpeechBackend::Local,
        AudioKind::Auto if text_len < threshold => SpeechBackend::Local,
        AudioKind::Auto => SpeechBackend::Networked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocab_is_always_local() {
        for len in [0, 1, 29, 30, 5_000] {
            assert_eq!(select(AudioKind::Vocab, len), SpeechBackend::Local);
        }
    }

    #[test]
    fn system_is_always_networked() {
        for len in [0, 1, 29, 30, 5_000] {
            assert_eq!(select(AudioKind::System, len), SpeechBackend::Networked);
        }
    }

    #[test]
    fn auto_boundary_at_thirty() {
        assert_eq!(select(AudioKind::Auto, 29), SpeechBackend::Local);
        assert_eq!(select(AudioKind::Auto, 30), SpeechBackend::Networked);
    }

    #[test]
    fn custom_threshold() {
        assert_eq!(
            select_with_threshold(AudioKind::Auto, 9, 10),
            SpeechBackend::Local
        );
        assert_eq!(
            select_with_threshold(AudioKind::Auto, 10, 10),
            SpeechBackend::Networked
        );
    }

    #[test]
    fn kind_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&AudioKind::Vocab).unwrap(), "\"vocab\"");
        let kind: AudioKind = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(kind, AudioKind::System);
    }
}
