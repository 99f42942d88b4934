//! Shared test utilities: in-memory database, mock collaborators, harness

#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use michi_gateway::config::{SpeechCheckConfig, WakeConfig};
use michi_gateway::knowledge::{KnowledgeCandidate, RelevanceGate, Retriever, TextEmbedder};
use michi_gateway::pipeline::{Pipeline, PipelineParts, PipelineSettings};
use michi_gateway::publisher::CommandSink;
use michi_gateway::voice::{SpeechCheck, SpeechSynthesizer, Transcriber, TtsProvider};
use michi_gateway::{
    db, AudioStateStore, ChatLogRepo, ChatModel, DbPool, Error, Intent, Result, WakeWordDetector,
};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Poll until the condition holds; background tasks get a short grace period
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

/// WAV bytes of a 220 Hz tone at the given length and amplitude
#[must_use]
pub fn wav_bytes(duration_secs: f32, amplitude: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let num_samples = (duration_secs * 16_000.0) as usize;
        for i in 0..num_samples {
            let t = i as f32 / 16_000.0;
            let sample = (2.0 * std::f32::consts::PI * 220.0 * t).sin() * amplitude;
            writer
                .write_sample((sample * f32::from(i16::MAX)) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Audio long and loud enough to pass the speech validity check
#[must_use]
pub fn valid_speech_bytes() -> Vec<u8> {
    wav_bytes(2.0, 0.5)
}

/// Audio too quiet to pass the speech validity check
#[must_use]
pub fn quiet_speech_bytes() -> Vec<u8> {
    wav_bytes(2.0, 0.001)
}

pub struct MockTranscriber {
    pub text: String,
    pub calls: AtomicUsize,
}

impl MockTranscriber {
    #[must_use]
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Chat mock that answers classification and generation differently
///
/// The classification prompt asks for a bare label, which is how the mock
/// tells the two call sites apart.
pub struct MockChat {
    pub label: String,
    pub reply: String,
    pub fail_classification: bool,
    pub fail_generation: bool,
    pub classify_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub grounded_prompts: Mutex<Vec<String>>,
}

impl MockChat {
    #[must_use]
    pub fn new(label: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            reply: reply.to_string(),
            fail_classification: false,
            fail_generation: false,
            classify_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            grounded_prompts: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn failing_classification(label: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            reply: reply.to_string(),
            fail_classification: true,
            fail_generation: false,
            classify_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            grounded_prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_grounded_prompt(&self) -> Option<String> {
        self.grounded_prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for MockChat {
    async fn complete(&self, system: &str, _user: &str) -> Result<String> {
        if system.contains("Respond with only the label") {
            self.classify_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_classification {
                return Err(Error::Llm("classification unavailable".to_string()));
            }
            Ok(self.label.clone())
        } else {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.grounded_prompts.lock().unwrap().push(system.to_string());
            if self.fail_generation {
                return Err(Error::Llm("generation unavailable".to_string()));
            }
            Ok(self.reply.clone())
        }
    }
}

pub struct MockRetriever {
    pub candidates: Vec<KnowledgeCandidate>,
    pub calls: AtomicUsize,
}

impl MockRetriever {
    #[must_use]
    pub fn new(candidates: Vec<KnowledgeCandidate>) -> Arc<Self> {
        Arc::new(Self {
            candidates,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn retrieve(
        &self,
        _robot_id: &str,
        _query: &str,
        _k: usize,
    ) -> Result<Vec<KnowledgeCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }
}

pub struct MockTtsProvider {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockTtsProvider {
    #[must_use]
    pub fn new(fail: bool) -> (Box<dyn TtsProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                fail,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait]
impl TtsProvider for MockTtsProvider {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::Tts("provider down".to_string()))
        } else {
            Ok(b"mp3-bytes".to_vec())
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub struct MockSink {
    pub published: Mutex<Vec<(String, String)>>,
}

impl MockSink {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
        })
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandSink for MockSink {
    async fn publish(&self, robot_id: &str, intent: Intent) {
        self.published
            .lock()
            .unwrap()
            .push((robot_id.to_string(), intent.as_str().to_string()));
    }
}

/// Embedder stub producing a constant vector
pub struct MockEmbedder;

#[async_trait]
impl TextEmbedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1; 1536])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.1; 1536]).collect())
    }
}

/// Tunables for a test pipeline
pub struct HarnessOptions {
    pub transcript: String,
    pub intent_label: String,
    pub reply: String,
    pub candidates: Vec<KnowledgeCandidate>,
    pub primary_tts_fails: bool,
    pub fallback_tts_fails: bool,
    pub fail_classification: bool,
    pub max_audio_bytes: usize,
    pub relevance_threshold: f32,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            transcript: "siapa presiden pertama indonesia".to_string(),
            intent_label: "talk".to_string(),
            reply: "Soekarno adalah presiden pertama Indonesia.".to_string(),
            candidates: Vec::new(),
            primary_tts_fails: false,
            fallback_tts_fails: false,
            fail_classification: false,
            max_audio_bytes: 10 * 1024 * 1024,
            relevance_threshold: 0.7,
        }
    }
}

/// Fully mocked pipeline with handles for assertions
pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub pool: DbPool,
    pub transcriber: Arc<MockTranscriber>,
    pub chat: Arc<MockChat>,
    pub retriever: Arc<MockRetriever>,
    pub sink: Arc<MockSink>,
    pub primary_tts_calls: Arc<AtomicUsize>,
    pub fallback_tts_calls: Arc<AtomicUsize>,
    pub audio_store: AudioStateStore,
    pub chat_logs: ChatLogRepo,
    pub upload_dir: PathBuf,
    // Keeps the upload dir alive for the harness lifetime
    _upload_guard: tempfile::TempDir,
}

impl Harness {
    /// Response artifacts currently present in the upload dir
    pub fn artifacts(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.upload_dir)
            .unwrap()
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("response_"))
            })
            .collect()
    }
}

/// Build a pipeline over mocks and an in-memory database
#[must_use]
pub fn build_harness(opts: HarnessOptions) -> Harness {
    let upload_guard = tempfile::tempdir().expect("failed to create upload dir");
    let upload_dir = upload_guard.path().to_path_buf();

    let pool = setup_test_db();
    let chat_logs = ChatLogRepo::new(pool.clone());
    let audio_store = AudioStateStore::new();

    let transcriber = MockTranscriber::new(&opts.transcript);
    let chat = if opts.fail_classification {
        MockChat::failing_classification(&opts.intent_label, &opts.reply)
    } else {
        MockChat::new(&opts.intent_label, &opts.reply)
    };
    let retriever = MockRetriever::new(opts.candidates);
    let sink = MockSink::new();

    let (primary, primary_tts_calls) = MockTtsProvider::new(opts.primary_tts_fails);
    let (fallback, fallback_tts_calls) = MockTtsProvider::new(opts.fallback_tts_fails);

    let pipeline = Arc::new(Pipeline::new(PipelineParts {
        transcriber: transcriber.clone(),
        chat: chat.clone(),
        retriever: retriever.clone(),
        synthesizer: Arc::new(SpeechSynthesizer::new(primary, fallback)),
        publisher: sink.clone(),
        audio_store: audio_store.clone(),
        chat_logs: chat_logs.clone(),
        wake: WakeWordDetector::new(&WakeConfig {
            phrases: vec![
                "michi".to_string(),
                "hai michi".to_string(),
                "halo michi".to_string(),
                "robot michi".to_string(),
            ],
            threshold: 85,
        }),
        speech_check: SpeechCheck::new(SpeechCheckConfig::default()),
        gate: RelevanceGate::new(opts.relevance_threshold),
        settings: PipelineSettings {
            upload_dir: upload_dir.clone(),
            max_audio_bytes: opts.max_audio_bytes,
            retrieval_k: 3,
        },
    }));

    Harness {
        pipeline,
        pool,
        transcriber,
        chat,
        retriever,
        sink,
        primary_tts_calls,
        fallback_tts_calls,
        audio_store,
        chat_logs,
        upload_dir,
        _upload_guard: upload_guard,
    }
}
