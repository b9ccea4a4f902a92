use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use lexiflow_common::{
    DEFAULT_CONFIG_PATH, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SERVER_URL, LexiflowConfig, StreamConfig, routes,
};
use lexiflow_stream::catalog::{evaluation_shape, product_shape, vocabulary_shape};
use lexiflow_stream::{FrameConsumer, StreamConsumer, StreamError, fetch_frames, fetch_records};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use tracing_subscriber::FmtSubscriber;

mod display;

/// Command-line arguments for the Lexiflow CLI
#[derive(Parser)]
#[command(name = "lexiflow", about = "Lexiflow - streamed vocabulary and IELTS practice")]
pub struct Args {
    /// Base URL of the Lexiflow server
    #[clap(long, default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Configuration file; only the `[stream]` section is used
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable debug mode
    #[clap(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream vocabulary items for a topic
    Vocab {
        #[clap(short, long)]
        topic: String,
        #[clap(short, long)]
        count: Option<usize>,
        #[clap(short, long)]
        level: Option<String>,
    },
    /// Stream product suggestions
    Products {
        #[clap(short, long)]
        query: String,
        #[clap(short, long)]
        count: Option<usize>,
    },
    /// Grade an IELTS answer
    Evaluate {
        #[clap(short, long)]
        task: String,
        #[clap(short, long)]
        answer: String,
    },
    /// Ask a question and stream the answer
    Ask {
        #[clap(short, long)]
        question: String,
        #[clap(long)]
        context: Option<String>,
    },
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received; cancelling stream");
            token.cancel();
        }
    });
}

fn endpoint(server: &str, route: &str) -> String {
    format!("{}{}", server.trim_end_matches('/'), route)
}

async fn run(
    args: Args,
    stream: &StreamConfig,
    client: reqwest::Client,
    token: CancellationToken,
) -> Result<(), StreamError> {
    let max_line_bytes = stream.max_line_bytes;
    match args.command {
        Command::Vocab { topic, count, level } => {
            println!("{}", format!("📚 Vocabulary: {}", topic).bright_cyan().bold());
            let mut index = 0;
            let consumed = fetch_records(
                &client,
                &endpoint(&args.server, routes::VOCABULARY),
                &json!({"topic": topic, "count": count, "level": level}),
                StreamConsumer::new(vocabulary_shape())
                    .with_max_line_bytes(max_line_bytes)
                    .with_cancellation(token),
                |item| {
                    index += 1;
                    println!("{}", display::vocabulary_line(index, item));
                },
            )
            .await?;
            summary(consumed.records.len(), consumed.rejected, consumed.is_cancelled());
        }
        Command::Products { query, count } => {
            println!("{}", format!("🛒 Products: {}", query).bright_cyan().bold());
            let mut index = 0;
            let consumed = fetch_records(
                &client,
                &endpoint(&args.server, routes::PRODUCTS),
                &json!({"query": query, "count": count}),
                StreamConsumer::new(product_shape())
                    .with_max_line_bytes(max_line_bytes)
                    .with_cancellation(token),
                |product| {
                    index += 1;
                    println!("{}", display::product_line(index, product));
                },
            )
            .await?;
            summary(consumed.records.len(), consumed.rejected, consumed.is_cancelled());
        }
        Command::Evaluate { task, answer } => {
            println!("{}", "📝 Evaluating answer...".bright_cyan().bold());
            let consumed = fetch_records(
                &client,
                &endpoint(&args.server, routes::EVALUATION),
                &json!({"task": task, "answer": answer}),
                StreamConsumer::new(evaluation_shape())
                    .with_max_line_bytes(max_line_bytes)
                    .with_cancellation(token),
                display::print_evaluation,
            )
            .await?;
            if consumed.records.is_empty() && !consumed.is_cancelled() {
                println!("{}", "No evaluation received.".yellow());
            }
        }
        Command::Ask { question, context } => {
            println!("{}", format!("❓ {}", question).bright_cyan().bold());
            let outcome = fetch_frames(
                &client,
                &endpoint(&args.server, routes::ANSWER),
                &json!({"question": question, "context": context}),
                FrameConsumer::new()
                    .with_max_line_bytes(max_line_bytes)
                    .with_cancellation(token),
                display::print_payload,
            )
            .await?;
            println!();
            if outcome.cancelled {
                println!("{}", "⏹ Cancelled.".yellow());
            } else if outcome.truncated() {
                println!("{}", "⚠ The answer ended early.".yellow());
            }
        }
    }
    Ok(())
}

fn summary(received: usize, rejected: usize, cancelled: bool) {
    let mut line = format!("✔ {} received", received);
    if rejected > 0 {
        line.push_str(&format!(", {} skipped", rejected));
    }
    if cancelled {
        println!("{}", format!("⏹ Cancelled. {}", line).yellow());
    } else {
        println!("{}", line.bright_green());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Setup tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = LexiflowConfig::load_or_default(&args.config)?;
    config.apply_env()?;

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT))
        .build()?;

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());

    if let Err(e) = run(args, &config.stream, client, token).await {
        error!("Stream failed: {}", e);
        println!("{}", format!("❌ {}", e).red());
        std::process::exit(1);
    }

    Ok(())
}
