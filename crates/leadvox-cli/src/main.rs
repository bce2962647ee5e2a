use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use leadvox_core::config::config_warnings;
use leadvox_core::*;
use leadvox_provider::{create_provider, Transcriber, WhisperTranscriber};
use leadvox_schema::{IntentKind, Utterance};
use leadvox_server::state::AppState;
use leadvox_store::AirtableStore;

#[derive(Parser)]
#[command(name = "leadvox", version, about = "Voice notes to CRM records")]
struct Cli {
    #[arg(
        long,
        default_value = ".",
        help = "Config root directory (contains config/main.yaml and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP webhook and recorder server")]
    Serve {
        #[arg(long, help = "Override the configured HTTP port")]
        port: Option<u16>,
    },
    #[command(about = "Validate configuration and report missing settings")]
    Validate,
    #[command(about = "Classify a transcription without extracting or writing")]
    Classify {
        #[arg(help = "Transcribed text")]
        text: String,
    },
    #[command(about = "Extract fields for an intent without writing")]
    Extract {
        #[arg(help = "Transcribed text")]
        text: String,
        #[arg(long, default_value = "new_lead", help = "Intent whose extractor to run")]
        intent: String,
    },
    #[command(about = "Run the full pipeline and write to the CRM")]
    Process {
        #[arg(help = "Transcribed text")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if cli.config_root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.config_root = PathBuf::from(home).join(
                cli.config_root
                    .strip_prefix("~")
                    .unwrap_or(&cli.config_root),
            );
        }
    }

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "leadvox.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(&cli.config_root)?;
    tracing::debug!(root = %cli.config_root.display(), "configuration loaded");

    match command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", config.server.host, port);
            let mut state = AppState::new(Arc::new(build_router(&config)?), config.server.public_url());
            if let Some(transcriber) = build_transcriber(&config) {
                state = state.with_transcriber(transcriber);
            }
            leadvox_server::serve(state, &addr).await?;
        }
        Commands::Validate => {
            let warnings = config_warnings(&config);
            println!(
                "Config valid. LLM model {} via {:?}, {} warning(s).",
                config.llm.model,
                config.llm.provider,
                warnings.len()
            );
            for warning in warnings {
                println!("  - {warning}");
            }
        }
        Commands::Classify { text } => {
            let decision = build_router(&config)?.classify_only(&text).await;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Extract { text, intent } => {
            let kind = IntentKind::parse(&intent);
            match build_router(&config)?.extract_only(kind, &text).await {
                Some(fields) => println!("{}", serde_json::to_string_pretty(&fields)?),
                None => println!("Intent '{intent}' has no extractor."),
            }
        }
        Commands::Process { text } => {
            let outcome = build_router(&config)?
                .process(&Utterance::new(text))
                .await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

fn build_router(config: &LeadvoxConfig) -> Result<IntentRouter> {
    let provider = create_provider(&config.llm.provider_config())?;
    let store = Arc::new(AirtableStore::new(config.store.clone()));
    Ok(IntentRouter::new(
        provider,
        store,
        config.llm.router_options(),
    ))
}

fn build_transcriber(config: &LeadvoxConfig) -> Option<Arc<dyn Transcriber>> {
    let api_key = config.transcription.api_key.as_deref()?;
    let transcriber = WhisperTranscriber::new(api_key, &config.transcription.base_url)
        .with_model(&config.transcription.model)
        .with_timeout(Duration::from_secs(config.transcription.timeout_secs));
    Some(Arc::new(transcriber))
}
