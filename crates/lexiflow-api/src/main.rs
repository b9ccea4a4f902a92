//! Lexiflow API server binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use lexiflow_api::{AppState, router};
use lexiflow_common::{DEFAULT_CONFIG_PATH, LexiflowConfig};
use lexiflow_llm::{GenaiGenerator, TextGenerator};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for the Lexiflow API server
#[derive(Parser, Debug)]
#[clap(name = "lexiflow-api", about = "NDJSON streaming server for Lexiflow")]
struct Args {
    /// Path to the configuration file (created with defaults if missing)
    #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Host to bind to
    #[clap(long)]
    host: Option<String>,

    /// Port to listen on
    #[clap(short, long)]
    port: Option<u16>,

    /// Model to generate with
    #[clap(long)]
    model: Option<String>,

    /// Path to a system prompt file
    #[clap(long)]
    prompt: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // File, then environment, then flags
    let mut config = LexiflowConfig::load(&args.config)?;
    config.apply_env()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(model) = args.model {
        config.provider.model = model;
    }
    if let Some(prompt_path) = &args.prompt {
        config.provider.system_prompt = Some(std::fs::read_to_string(prompt_path)?);
    }
    config.validate()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Lexiflow API server...");
    info!("Model: {}", config.provider.model);

    let generator: Arc<dyn TextGenerator> = Arc::new(GenaiGenerator::new(&config.provider.model));
    let app = router(AppState::new(generator, &config));

    let addr = config.server.bind_address();
    info!("Binding to address: {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
