//! Configuration management for the Michi gateway
//!
//! All configuration is read from the environment exactly once at startup and
//! carried in an explicit [`Config`] value; there is no ambient global state.

use std::path::PathBuf;

use crate::{Error, Result};

/// Default maximum audio payload size (10 MiB)
const DEFAULT_MAX_AUDIO_SIZE: usize = 10 * 1024 * 1024;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the HTTP server
    pub port: u16,

    /// Directory for response audio artifacts and upload staging
    pub upload_dir: PathBuf,

    /// Path to the `SQLite` database file
    pub db_path: PathBuf,

    /// Maximum accepted audio payload in bytes
    pub max_audio_bytes: usize,

    /// Wake-word detection settings
    pub wake: WakeConfig,

    /// MQTT command channel settings
    pub mqtt: MqttConfig,

    /// LLM settings (intent classification + response generation)
    pub llm: LlmConfig,

    /// Speech-to-text settings
    pub stt: SttConfig,

    /// Text-to-speech settings
    pub tts: TtsConfig,

    /// Knowledge retrieval settings
    pub retrieval: RetrievalConfig,

    /// Speech validity pre-check settings
    pub speech: SpeechCheckConfig,
}

/// Wake-word detection settings
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// Phrases that activate the robot
    pub phrases: Vec<String>,

    /// Acceptance threshold on the 0-100 fuzzy score scale
    pub threshold: u8,
}

/// MQTT command channel settings
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker hostname
    pub broker: String,

    /// Broker port
    pub port: u16,

    /// Base topic; the per-robot topic is `{base}/{robot_id}`
    pub topic_base: String,
}

/// LLM settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `OpenAI` API key
    pub api_key: String,

    /// Chat model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,
}

/// Speech-to-text settings
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Transcription model (e.g. "whisper-1")
    pub model: String,

    /// ISO-639-1 language hint passed to the transcriber
    pub language: String,
}

/// Text-to-speech settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// `ElevenLabs` API key (primary provider)
    pub api_key: String,

    /// `ElevenLabs` voice identifier
    pub voice_id: String,

    /// `ElevenLabs` model identifier
    pub model: String,

    /// Language for the fallback provider
    pub fallback_language: String,
}

/// Knowledge retrieval settings
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Number of nearest-neighbour candidates to fetch
    pub k: usize,

    /// Distance threshold for the relevance gate.
    /// Scores are L2 distances: a candidate is relevant when
    /// `score <= relevance_threshold`.
    pub relevance_threshold: f32,
}

/// Speech validity pre-check settings
#[derive(Debug, Clone, Copy)]
pub struct SpeechCheckConfig {
    /// Minimum utterance duration in milliseconds
    pub min_duration_ms: u32,

    /// Minimum loudness in dBFS (negative; closer to 0 is louder)
    pub min_dbfs: f32,
}

impl Default for SpeechCheckConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 1100,
            min_dbfs: -40.0,
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("missing required environment variable: {name}")))
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if a required API key is missing or the upload
    /// directory cannot be created
    pub fn from_env() -> Result<Self> {
        let openai_key = required_env("OPENAI_API_KEY")?;
        let elevenlabs_key = required_env("ELEVENLABS_API_KEY")?;

        let upload_dir = PathBuf::from(env_or("MICHI_UPLOAD_DIR", "uploads"));
        std::fs::create_dir_all(&upload_dir).map_err(|e| {
            Error::Config(format!(
                "cannot create upload dir {}: {e}",
                upload_dir.display()
            ))
        })?;

        let wake = WakeConfig {
            phrases: env_or("MICHI_WAKE_WORDS", "michi,hai michi,halo michi,robot michi")
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            threshold: env_parse("MICHI_WAKE_THRESHOLD", 85),
        };

        let mqtt = MqttConfig {
            broker: env_or("MQTT_BROKER", "broker.emqx.io"),
            port: env_parse("MQTT_PORT", 1883),
            topic_base: env_or("MQTT_TOPIC", "michi/commands"),
        };

        let llm = LlmConfig {
            api_key: openai_key.clone(),
            model: env_or("MICHI_LLM_MODEL", "gpt-4.1-nano"),
            temperature: env_parse("MICHI_LLM_TEMPERATURE", 0.6),
        };

        let stt = SttConfig {
            model: env_or("MICHI_STT_MODEL", "whisper-1"),
            language: env_or("MICHI_STT_LANGUAGE", "id"),
        };

        let tts = TtsConfig {
            api_key: elevenlabs_key,
            voice_id: env_or("MICHI_TTS_VOICE", "iWydkXKoiVtvdn4vLKp9"),
            model: env_or("MICHI_TTS_MODEL", "eleven_flash_v2_5"),
            fallback_language: env_or("MICHI_TTS_FALLBACK_LANGUAGE", "id"),
        };

        let retrieval = RetrievalConfig {
            k: env_parse("MICHI_RETRIEVAL_K", 3),
            relevance_threshold: env_parse("MICHI_RELEVANCE_THRESHOLD", 0.7),
        };

        Ok(Self {
            port: env_parse("MICHI_PORT", 5000),
            upload_dir,
            db_path: PathBuf::from(env_or("MICHI_DB_PATH", "michi.db")),
            max_audio_bytes: env_parse("MICHI_MAX_AUDIO_SIZE", DEFAULT_MAX_AUDIO_SIZE),
            wake,
            mqtt,
            llm,
            stt,
            tts,
            retrieval,
            speech: SpeechCheckConfig::default(),
        })
    }
}
