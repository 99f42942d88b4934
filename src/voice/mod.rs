//! Voice processing: transcription, synthesis, and speech validation

pub mod stt;
pub mod tts;
pub mod validate;

pub use stt::{Transcriber, WhisperClient};
pub use tts::{ElevenLabsTts, GoogleTranslateTts, SpeechSynthesizer, Synthesizer, TtsProvider};
pub use validate::SpeechCheck;
