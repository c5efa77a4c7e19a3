//! Networked synthesis through the Gemini `generateContent` API.
//!
//! The service returns 24 kHz, 16-bit mono PCM as base64 inside
//! `candidates[0].content.parts[0].inlineData.data`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use vakya_core::{SpeechSynthesizer, SynthesisError, VoiceSettings};

/// Base URL of the Generative Language API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sample rate of the PCM the service returns.
pub const NETWORK_SAMPLE_RATE: u32 = 24_000;

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Characters removed before text is sent for synthesis.
const MARKUP_CHARS: [char; 8] = ['*', '#', '`', '-', '[', ']', '>', '|'];

/// Connection settings for [`GeminiSynthesizer`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key. `None` makes every request fail with `NotConfigured`.
    pub api_key: Option<String>,

    /// TTS model id.
    pub model: String,

    /// Prebuilt voice name.
    pub voice_name: String,

    /// API base URL, overridable for tests and proxies.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Build from voice settings, reading the API key from the environment.
    #[must_use]
    pub fn from_env(settings: &VoiceSettings) -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty());

        Self {
            api_key,
            model: settings.tts_model.clone(),
            voice_name: settings.voice_name.clone(),
            base_url: GEMINI_API_BASE.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// [`SpeechSynthesizer`] backed by the Gemini API.
pub struct GeminiSynthesizer {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiSynthesizer {
    /// Create a synthesizer. Fails only if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        if config.api_key.is_none() {
            tracing::warn!(
                "No Gemini API key set ({}), networked speech will be skipped",
                API_KEY_ENV_VARS.join(" or ")
            );
        }

        Ok(Self { client, config })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Option<String>, SynthesisError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            SynthesisError::NotConfigured(format!("{} is not set", API_KEY_ENV_VARS[0]))
        })?;

        let body = build_request(text, &self.config.voice_name);
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;

        let audio = parsed.first_audio();
        tracing::debug!(
            model = %self.config.model,
            has_audio = audio.is_some(),
            "Gemini synthesis response"
        );
        Ok(audio)
    }

    fn sample_rate(&self) -> u32 {
        NETWORK_SAMPLE_RATE
    }
}

// ── Request / response ─────────────────────────────────────────────

/// Remove markup characters the voice would otherwise read out.
#[must_use]
pub fn clean_for_speech(text: &str) -> String {
    text.chars()
        .filter(|c| !MARKUP_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// The instruction wrapped around every chunk.
#[must_use]
pub fn speech_prompt(text: &str) -> String {
    format!(
        "Say in Sanskrit specifically (if Sanskrit) or Vietnamese (if explanation), slowly and clearly: \"{}\"",
        clean_for_speech(text)
    )
}

/// JSON body of a `generateContent` TTS request.
#[must_use]
pub fn build_request(text: &str, voice_name: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": speech_prompt(text) }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice_name }
                }
            }
        }
    })
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: Option<String>,
}

impl GenerateContentResponse {
    /// Only the first part of the first candidate is consulted.
    fn first_audio(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .inline_data?
            .data
    }
}

/// Extract the base64 audio from a raw response body.
pub fn parse_audio_response(body: &str) -> Result<Option<String>, SynthesisError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;
    Ok(parsed.first_audio())
}
