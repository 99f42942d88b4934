//! Intent classification
//!
//! Maps a transcript onto the closed set of robot behaviors. Classification
//! never fails a request: any error or out-of-set label collapses to
//! [`Intent::Talk`], which keeps the robot conversational when the model
//! misbehaves.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llm::ChatModel;
use crate::prompt;

/// Robot behaviors a user utterance can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Conversational turn (the default)
    Talk,
    /// Dance animation
    Dance,
    /// Sleep/idle mode
    Sleep,
    /// Happy expression
    Happy,
    /// Angry expression
    Mad,
    /// Sad expression
    Sad,
    /// Farewell routine
    Goodbye,
    /// Self-introduction routine
    Introduction,
    /// Object detection mode
    Detect,
}

impl Intent {
    /// Stable lowercase label used on the wire and in prompts
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Talk => "talk",
            Self::Dance => "dance",
            Self::Sleep => "sleep",
            Self::Happy => "happy",
            Self::Mad => "mad",
            Self::Sad => "sad",
            Self::Goodbye => "goodbye",
            Self::Introduction => "introduction",
            Self::Detect => "detect",
        }
    }

    /// Parse a label; returns `None` for anything outside the closed set
    #[must_use]
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "talk" => Some(Self::Talk),
            "dance" => Some(Self::Dance),
            "sleep" => Some(Self::Sleep),
            "happy" => Some(Self::Happy),
            "mad" => Some(Self::Mad),
            "sad" => Some(Self::Sad),
            "goodbye" => Some(Self::Goodbye),
            "introduction" => Some(Self::Introduction),
            "detect" => Some(Self::Detect),
            _ => None,
        }
    }

    /// All labels the classifier may emit
    #[must_use]
    pub const fn labels() -> &'static [&'static str] {
        &[
            "talk",
            "dance",
            "sleep",
            "happy",
            "mad",
            "sad",
            "goodbye",
            "introduction",
            "detect",
        ]
    }

    /// Whether this intent produces a spoken response
    #[must_use]
    pub const fn is_conversational(self) -> bool {
        matches!(self, Self::Talk)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifies transcripts into intents via a single chat completion
#[derive(Clone)]
pub struct IntentClassifier {
    chat: Arc<dyn ChatModel>,
}

impl IntentClassifier {
    /// Create a new classifier backed by the given chat model
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Classify a transcript. Infallible: errors and unknown labels
    /// fall back to [`Intent::Talk`].
    pub async fn classify(&self, transcript: &str) -> Intent {
        let system = prompt::intent_prompt();

        match self.chat.complete(&system, transcript).await {
            Ok(label) => {
                let normalized = label.trim().to_lowercase();
                match Intent::from_label(&normalized) {
                    Some(intent) => {
                        tracing::info!(intent = %intent, "intent classified");
                        intent
                    }
                    None => {
                        tracing::warn!(label = %normalized, "unknown intent label, defaulting to talk");
                        Intent::Talk
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "intent classification failed, defaulting to talk");
                Intent::Talk
            }
        }
    }
}
