//! Replay a model reply through the streaming speech pipeline.
//!
//! Usage: `speakstream-replay [--chunk N] [FILE]`
//!
//! Reads the reply from FILE (or stdin), feeds it in chunks of N characters,
//! "speaks" each sentence to the log and prints the compacted chat log as
//! JSON on stdout. Tracing output goes to stderr.

use async_trait::async_trait;
use speakstream::config::SpeechConfig;
use speakstream::pipeline::messages::Utterance;
use speakstream::pipeline::{
    PlaybackOrderer, QueuedPlayback, SharedSession, StaticChunks, StreamProcessor, UtteranceSink,
};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_CHUNK_CHARS: usize = 8;
const MILLIS_PER_CHAR: u64 = 15;

/// Speaker that logs utterances and waits roughly as long as speaking them.
struct ConsoleSink;

#[async_trait]
impl UtteranceSink for ConsoleSink {
    async fn play(&mut self, utterance: &Utterance) -> speakstream::Result<()> {
        tracing::info!(emotion = %utterance.emotion(), "speaking: {}", utterance.text);
        let chars = utterance.text.chars().count() as u64;
        tokio::time::sleep(Duration::from_millis(chars.saturating_mul(MILLIS_PER_CHAR))).await;
        Ok(())
    }
}

struct Args {
    chunk_chars: usize,
    input: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        chunk_chars: DEFAULT_CHUNK_CHARS,
        input: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--chunk" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--chunk needs a value"))?;
                parsed.chunk_chars = value.parse()?;
            }
            "-h" | "--help" => {
                eprintln!("usage: speakstream-replay [--chunk N] [FILE]");
                std::process::exit(0);
            }
            _ if parsed.input.is_none() => parsed.input = Some(arg),
            _ => anyhow::bail!("unexpected argument: {arg}"),
        }
    }
    Ok(parsed)
}

fn load_config() -> anyhow::Result<SpeechConfig> {
    let path = SpeechConfig::default_config_path();
    if path.exists() {
        tracing::info!(path = %path.display(), "loading config");
        Ok(SpeechConfig::from_file(&path)?)
    } else {
        Ok(SpeechConfig::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    let config = load_config()?;

    let reply = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let cancel = CancellationToken::new();
    let (playback, worker) = QueuedPlayback::spawn(ConsoleSink, cancel.clone());
    let session = Arc::new(SharedSession::new());
    let orderer = PlaybackOrderer::new(Arc::new(playback), Arc::clone(&session));
    let processor = StreamProcessor::new(&config.stream, orderer.clone(), Arc::clone(&session));

    let mut reader = StaticChunks::split(&reply, args.chunk_chars);
    let log = processor.process_stream_response(&mut reader).await;
    orderer.wait_idle().await?;

    cancel.cancel();
    if let Err(e) = worker.await {
        tracing::warn!("playback worker failed: {e}");
    }

    println!("{}", serde_json::to_string_pretty(&log)?);
    if let Some(popup) = session.popup() {
        tracing::info!("popup: {popup}");
    }
    Ok(())
}
