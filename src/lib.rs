//! Michi Gateway - voice-driven conversational assistant for a physical robot
//!
//! Per utterance the gateway transcribes uploaded audio, classifies intent,
//! retrieves grounding knowledge, generates a reply, synthesizes speech and
//! pushes the intent to the robot over MQTT.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     HTTP API                          │
//! │  /process_input │ /detect_wakeword │ /text_chat │ ... │
//! └────────────────────────┬─────────────────────────────┘
//!                          │
//! ┌────────────────────────▼─────────────────────────────┐
//! │                     Pipeline                          │
//! │  STT │ Intent │ Retrieval + Gate │ LLM │ TTS chain   │
//! └──────┬──────────────────┬──────────────────┬─────────┘
//!        │                  │                  │
//!   audio store        sqlite-vec         MQTT publish
//! ```

pub mod api;
pub mod audio_store;
pub mod config;
pub mod db;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod publisher;
pub mod voice;
pub mod wake_word;

pub use audio_store::AudioStateStore;
pub use config::Config;
pub use db::{ChatLogEntry, ChatLogRepo, DbConn, DbPool};
pub use error::{Error, Result};
pub use intent::{Intent, IntentClassifier};
pub use knowledge::{
    format_knowledge, Embedder, KnowledgeCandidate, KnowledgeStore, RelevanceGate, Retriever,
    TextEmbedder,
};
pub use llm::{ChatClient, ChatModel};
pub use pipeline::{ChatTurn, Pipeline, TurnOutcome, WakewordOutcome};
pub use publisher::{CommandSink, MqttPublisher};
pub use voice::{
    SpeechCheck, SpeechSynthesizer, Synthesizer, Transcriber, TtsProvider, WhisperClient,
};
pub use wake_word::WakeWordDetector;
