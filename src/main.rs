//! Docbot CLI - chat with a PDF from the terminal.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use clap::{Args, Parser, Subcommand};
use docbot::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Docbot - chat with a PDF, grounded answers with web-search fallback
#[derive(Parser)]
#[command(name = "docbot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat(ChatArgs),

    /// Stage, process and answer a single question, then exit
    Ask(AskArgs),

    /// Show configuration and environment status
    Status,
}

/// Arguments for the chat command
#[derive(Args)]
struct ChatArgs {
    /// PDF to stage at startup
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Process the staged file immediately
    #[arg(short, long, requires = "file")]
    process: bool,

    /// Chat model to use (overrides config)
    #[arg(short = 'M', long, env = "DOCBOT_CHAT_MODEL")]
    model: Option<String>,
}

/// Arguments for the ask command
#[derive(Args)]
struct AskArgs {
    /// PDF to index
    file: PathBuf,

    /// Question to ask about it
    question: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", DisplayError(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("docbot={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 3)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Chat(args) => cmd_chat(args).await,
        Commands::Ask(args) => cmd_ask(args).await,
        Commands::Status => cmd_status(),
    }
}

/// Build the session controller with its production collaborators.
fn build_controller(config: &BotConfig) -> Result<SessionController> {
    let embedder: Arc<OpenAiEmbedder> = Arc::new(OpenAiEmbedder::new(config));
    let indexer = Arc::new(QdrantIndexer::new(config, embedder.clone())?);
    let completion = Arc::new(OpenAiChat::new(config));
    let search = provider_from_config(config);
    let agent = Arc::new(RagAgent::new(
        config,
        embedder,
        indexer.clone(),
        completion,
        search,
    ));
    Ok(SessionController::new(indexer, agent))
}

/// Start interactive chat.
async fn cmd_chat(args: ChatArgs) -> Result<()> {
    let mut config = BotConfig::from_env()?;
    if let Some(model) = args.model {
        config.chat_model = model;
    }

    let controller = build_controller(&config)?;
    let mut repl = Repl::new(controller);

    if let Some(path) = args.file {
        let document = StagedDocument::from_path(&path)?;
        repl.load(document);
        if args.process {
            repl.process().await?;
        }
    }

    repl.run().await
}

/// One-shot question against a PDF.
async fn cmd_ask(args: AskArgs) -> Result<()> {
    let config = BotConfig::from_env()?;
    let mut controller = build_controller(&config)?;

    controller.select_file(StagedDocument::from_path(&args.file)?);
    controller.process_document().await?;

    let turn = controller
        .submit_message(args.question)
        .await
        .map_err(DocbotError::from)?;
    println!("{}", turn.content);
    Ok(())
}

/// Show configuration and environment status.
fn cmd_status() -> Result<()> {
    println!("Docbot Status\n");

    println!("Environment:");
    print_env_status("OPENAI_API_KEY");
    print_env_status("QDRANT_URL");
    print_env_status("SEARXNG_BASE_URL");
    print_env_status("TAVILY_API_KEY");
    println!();

    match BotConfig::from_env() {
        Ok(config) => {
            println!("Configuration:");
            println!("  Qdrant:          {}", config.qdrant_url);
            println!("  Collection:      {}", config.collection);
            println!("  Chat model:      {}", config.chat_model);
            println!("  Embedding model: {}", config.embedding_model);
            println!("  Dimensions:      {}", config.embedding_dimensions);
            println!("  Top-k:           {}", config.top_k);
            println!("  Web search:      {}", config.search.name());
        }
        Err(e) => {
            println!("Configuration: invalid ({e})");
        }
    }

    Ok(())
}

/// Print environment variable status.
fn print_env_status(name: &str) {
    let status = if std::env::var(name).is_ok() {
        "set"
    } else {
        "-"
    };
    println!("  {name}: {status}");
}
