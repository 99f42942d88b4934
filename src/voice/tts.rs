//! Text-to-speech (TTS) processing
//!
//! Two-tier synthesis: `ElevenLabs` is the primary provider, the Google
//! Translate TTS endpoint the fallback. Each tier is attempted at most once
//! per request; only when both fail does the request error out.

use async_trait::async_trait;

use crate::{Error, Result};

/// A single TTS backend
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Full synthesis chain used by the pipeline
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize text, trying the fallback tier when the primary fails
    ///
    /// # Errors
    ///
    /// Returns error if all tiers fail
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// `ElevenLabs` TTS client (primary tier)
pub struct ElevenLabsTts {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model: String,
}

impl ElevenLabsTts {
    /// Create a new `ElevenLabs` client
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn new(api_key: String, voice_id: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id,
            model,
        })
    }
}

#[async_trait]
impl TtsProvider for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            self.voice_id
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;
        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

/// Google Translate TTS client (fallback tier)
///
/// Uses the public `translate_tts` endpoint; no API key, limited quality,
/// but keeps the robot talking when the primary provider is down.
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    language: String,
}

impl GoogleTranslateTts {
    /// Create a new fallback client for the given language
    #[must_use]
    pub fn new(language: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            language,
        }
    }
}

#[async_trait]
impl TtsProvider for GoogleTranslateTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get("https://translate.google.com/translate_tts")
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Tts(format!("Google TTS error {status}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;
        if audio.is_empty() {
            return Err(Error::Tts("Google TTS returned empty audio".to_string()));
        }
        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        "google-translate"
    }
}

/// Primary/fallback synthesis chain
pub struct SpeechSynthesizer {
    primary: Box<dyn TtsProvider>,
    fallback: Box<dyn TtsProvider>,
}

impl SpeechSynthesizer {
    /// Create a chain from a primary and fallback provider
    #[must_use]
    pub fn new(primary: Box<dyn TtsProvider>, fallback: Box<dyn TtsProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Synthesizer for SpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let primary_err = match self.primary.synthesize(text).await {
            Ok(audio) => {
                tracing::debug!(provider = self.primary.name(), bytes = audio.len(), "synthesis complete");
                return Ok(audio);
            }
            Err(e) => {
                tracing::warn!(provider = self.primary.name(), error = %e, "primary TTS failed, trying fallback");
                e
            }
        };

        match self.fallback.synthesize(text).await {
            Ok(audio) => {
                tracing::info!(provider = self.fallback.name(), bytes = audio.len(), "fallback synthesis complete");
                Ok(audio)
            }
            Err(fallback_err) => Err(Error::Tts(format!(
                "all TTS tiers failed: {} ({primary_err}); {} ({fallback_err})",
                self.primary.name(),
                self.fallback.name(),
            ))),
        }
    }
}
