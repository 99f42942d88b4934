use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use michi_gateway::api::{self, ApiState};
use michi_gateway::knowledge::{Embedder, KnowledgeStore, RelevanceGate};
use michi_gateway::pipeline::{Pipeline, PipelineParts, PipelineSettings};
use michi_gateway::publisher::{CommandSink, MqttPublisher, NoopSink};
use michi_gateway::voice::{
    ElevenLabsTts, GoogleTranslateTts, SpeechCheck, SpeechSynthesizer, WhisperClient,
};
use michi_gateway::{db, AudioStateStore, ChatClient, ChatLogRepo, Config, WakeWordDetector};

/// Michi - voice gateway for a conversational robot companion
#[derive(Parser)]
#[command(name = "michi", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "MICHI_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,michi_gateway=info",
        1 => "info,michi_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let port = cli.port.unwrap_or(config.port);

    tracing::info!(port, db = %config.db_path.display(), "starting michi gateway");

    let pool = db::init(&config.db_path)?;
    let chat_logs = ChatLogRepo::new(pool.clone());

    let embedder = Arc::new(Embedder::new(config.llm.api_key.clone())?);
    let knowledge = Arc::new(KnowledgeStore::new(pool.clone(), embedder));

    let chat = Arc::new(ChatClient::new(
        config.llm.api_key.clone(),
        config.llm.model.clone(),
        config.llm.temperature,
    )?);

    let transcriber = Arc::new(WhisperClient::new(
        config.llm.api_key.clone(),
        config.stt.model.clone(),
        config.stt.language.clone(),
    )?);

    let synthesizer = Arc::new(SpeechSynthesizer::new(
        Box::new(ElevenLabsTts::new(
            config.tts.api_key.clone(),
            config.tts.voice_id.clone(),
            config.tts.model.clone(),
        )?),
        Box::new(GoogleTranslateTts::new(config.tts.fallback_language.clone())),
    ));

    // A dead broker must not stop the gateway from answering
    let publisher: Arc<dyn CommandSink> = match MqttPublisher::connect(&config.mqtt).await {
        Ok(p) => Arc::new(p),
        Err(e) => {
            tracing::warn!(error = %e, "MQTT unavailable, commands will be dropped");
            Arc::new(NoopSink)
        }
    };

    let audio_store = AudioStateStore::new();

    let pipeline = Arc::new(Pipeline::new(PipelineParts {
        transcriber,
        chat,
        retriever: knowledge.clone(),
        synthesizer,
        publisher,
        audio_store: audio_store.clone(),
        chat_logs: chat_logs.clone(),
        wake: WakeWordDetector::new(&config.wake),
        speech_check: SpeechCheck::new(config.speech),
        gate: RelevanceGate::new(config.retrieval.relevance_threshold),
        settings: PipelineSettings {
            upload_dir: config.upload_dir.clone(),
            max_audio_bytes: config.max_audio_bytes,
            retrieval_k: config.retrieval.k,
        },
    }));

    let state = Arc::new(ApiState {
        pipeline,
        audio_store,
        chat_logs,
        knowledge,
        max_audio_bytes: config.max_audio_bytes,
        db: pool,
    });

    tracing::info!("michi gateway ready");
    api::serve(state, port).await?;

    Ok(())
}
