//! Request orchestration
//!
//! One [`Pipeline`] instance drives every turn: intake checks, transcription,
//! intent classification, intent-gated retrieval and generation, speech
//! synthesis, audio state update, and background publish/log. Collaborators
//! sit behind traits so the whole flow is testable without network access.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::audio_store::AudioStateStore;
use crate::db::ChatLogRepo;
use crate::intent::{Intent, IntentClassifier};
use crate::knowledge::{format_knowledge, RelevanceGate, Retriever};
use crate::llm::ChatModel;
use crate::prompt;
use crate::publisher::CommandSink;
use crate::voice::{SpeechCheck, Synthesizer, Transcriber};
use crate::wake_word::WakeWordDetector;
use crate::{Error, Result};

/// Result of one audio turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Result of a wake-word check
#[derive(Debug, Clone, Serialize)]
pub struct WakewordOutcome {
    pub wakeword_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Result of a text-only turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub input: String,
    pub output: String,
    pub time: String,
}

/// Pipeline tunables derived from configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub upload_dir: PathBuf,
    pub max_audio_bytes: usize,
    pub retrieval_k: usize,
}

/// Collaborators for building a [`Pipeline`]
pub struct PipelineParts {
    pub transcriber: Arc<dyn Transcriber>,
    pub chat: Arc<dyn ChatModel>,
    pub retriever: Arc<dyn Retriever>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub publisher: Arc<dyn CommandSink>,
    pub audio_store: AudioStateStore,
    pub chat_logs: ChatLogRepo,
    pub wake: WakeWordDetector,
    pub speech_check: SpeechCheck,
    pub gate: RelevanceGate,
    pub settings: PipelineSettings,
}

/// The orchestration core
pub struct Pipeline {
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatModel>,
    classifier: IntentClassifier,
    retriever: Arc<dyn Retriever>,
    synthesizer: Arc<dyn Synthesizer>,
    publisher: Arc<dyn CommandSink>,
    audio_store: AudioStateStore,
    chat_logs: ChatLogRepo,
    wake: WakeWordDetector,
    speech_check: SpeechCheck,
    gate: RelevanceGate,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators
    #[must_use]
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            classifier: IntentClassifier::new(parts.chat.clone()),
            transcriber: parts.transcriber,
            chat: parts.chat,
            retriever: parts.retriever,
            synthesizer: parts.synthesizer,
            publisher: parts.publisher,
            audio_store: parts.audio_store,
            chat_logs: parts.chat_logs,
            wake: parts.wake,
            speech_check: parts.speech_check,
            gate: parts.gate,
            settings: parts.settings,
        }
    }

    /// Process one audio utterance end to end
    ///
    /// # Errors
    ///
    /// Returns error for oversized payloads or failed collaborators;
    /// classification and publish failures never error
    pub async fn process_audio(&self, robot_id: &str, audio: &[u8]) -> Result<TurnOutcome> {
        self.check_size(audio)?;

        let transcript = self.transcriber.transcribe(audio).await?;
        let intent = self.classifier.classify(&transcript).await;

        tracing::info!(robot_id, intent = %intent, transcript = %transcript, "turn classified");

        let (response, audio_url) = if intent.is_conversational() {
            let response = self.grounded_reply(robot_id, &transcript).await?;
            let speech = self.synthesizer.synthesize(&response).await?;
            let path = self.write_artifact(robot_id, &speech)?;
            self.audio_store.set(robot_id, path).await;

            let url = format!("/audio_response?robot_id={robot_id}");
            (Some(response), Some(url))
        } else {
            // Stale audio from an earlier talk turn must not be served
            self.audio_store.clear(robot_id).await;
            (None, None)
        };

        self.finish_turn(robot_id, intent, &transcript, response.as_deref());

        Ok(TurnOutcome {
            intent,
            response,
            audio_url,
        })
    }

    /// Check audio for a wake phrase
    ///
    /// Audio that fails the local speech validity check is rejected without
    /// spending a transcription call.
    ///
    /// # Errors
    ///
    /// Returns error for oversized payloads or transcription failure
    pub async fn detect_wakeword(&self, audio: &[u8]) -> Result<WakewordOutcome> {
        self.check_size(audio)?;

        if !self.speech_check.is_valid_speech(audio) {
            return Ok(WakewordOutcome {
                wakeword_detected: false,
                reason: Some("invalid_speech"),
            });
        }

        let transcript = self.transcriber.transcribe(audio).await?;
        let detected = self.wake.detect(&transcript);

        Ok(WakewordOutcome {
            wakeword_detected: detected,
            reason: None,
        })
    }

    /// Process a text-only turn: grounded generation, no synthesis or publish
    ///
    /// # Errors
    ///
    /// Returns error if retrieval or generation fails
    pub async fn text_chat(&self, robot_id: &str, message: &str) -> Result<ChatTurn> {
        let output = self.grounded_reply(robot_id, message).await?;
        self.log_turn(robot_id, message, Some(&output));

        Ok(ChatTurn {
            input: message.to_string(),
            output,
            time: Utc::now().to_rfc3339(),
        })
    }

    /// Retrieve, gate, and generate a grounded response
    async fn grounded_reply(&self, robot_id: &str, query: &str) -> Result<String> {
        let candidates = self
            .retriever
            .retrieve(robot_id, query, self.settings.retrieval_k)
            .await?;

        let selected = self.gate.select(candidates);
        tracing::debug!(robot_id, grounded_on = selected.len(), "relevance gate applied");

        let knowledge = format_knowledge(&selected);
        let system = prompt::grounded_prompt(&knowledge);

        self.chat.complete(&system, query).await
    }

    fn check_size(&self, audio: &[u8]) -> Result<()> {
        if audio.len() > self.settings.max_audio_bytes {
            return Err(Error::PayloadTooLarge {
                size: audio.len(),
                max: self.settings.max_audio_bytes,
            });
        }
        Ok(())
    }

    /// Write synthesized speech under the upload dir
    ///
    /// Bytes go to a scoped temp file first and are persisted with a rename,
    /// so a failed write leaves nothing behind.
    fn write_artifact(&self, robot_id: &str, speech: &[u8]) -> Result<PathBuf> {
        let final_path = self
            .settings
            .upload_dir
            .join(format!("response_{robot_id}_{}.mp3", Uuid::new_v4()));

        let mut staged = tempfile::NamedTempFile::new_in(&self.settings.upload_dir)?;
        staged.write_all(speech)?;
        staged
            .persist(&final_path)
            .map_err(|e| Error::Audio(format!("failed to persist audio artifact: {e}")))?;

        tracing::debug!(path = %final_path.display(), bytes = speech.len(), "audio artifact written");
        Ok(final_path)
    }

    /// Publish the intent and log the turn off the response path
    fn finish_turn(&self, robot_id: &str, intent: Intent, input: &str, output: Option<&str>) {
        let publisher = self.publisher.clone();
        let robot = robot_id.to_string();
        tokio::spawn(async move {
            publisher.publish(&robot, intent).await;
        });

        self.log_turn(robot_id, input, output);
    }

    fn log_turn(&self, robot_id: &str, input: &str, output: Option<&str>) {
        let repo = self.chat_logs.clone();
        let robot = robot_id.to_string();
        let input = input.to_string();
        let output = output.map(ToString::to_string);
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                repo.add(Some(&robot), &input, output.as_deref())
            })
            .await;

            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "interaction log insert failed"),
                Err(e) => tracing::warn!(error = %e, "interaction log task panicked"),
            }
        });
    }
}
