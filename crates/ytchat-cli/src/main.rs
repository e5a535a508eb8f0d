mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ytchat_config::{AppConfig, ConfigLoader};
use ytchat_security::RedactingWriter;

#[derive(Parser)]
#[command(name = "ytchat", version, about = "Chat with an AI assistant about YouTube videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file path (default: ~/.ytchat/config.yml)
    #[arg(long, global = true, env = "YTCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Provider to use: openai, claude or gemini
    #[arg(long, short, global = true)]
    provider: Option<String>,

    /// Override the provider's model
    #[arg(long, short, global = true)]
    model: Option<String>,

    /// Log level filter, e.g. "debug" or "ytchat_agents=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question about a video
    Ask {
        /// YouTube URL or video id
        video: String,
        question: String,
        #[arg(long)]
        title: Option<String>,
        /// File holding the video transcript
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Start a new conversation even if one exists for this video
        #[arg(long)]
        new: bool,
    },
    /// Summarize a video and list its key points
    Summarize {
        video: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the latest conversation for a video
    History {
        video: String,
        /// Include system messages
        #[arg(long)]
        all: bool,
    },
    /// List stored conversations, most recent first
    List,
    /// Delete a conversation by id
    Delete { id: String },
    /// Remove every stored conversation
    ClearAll,
    /// Manage stored API keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store an API key for a provider
    Set { provider: String, api_key: String },
    /// Remove the stored key for a provider
    Clear { provider: String },
    /// Show whether a key is available for a provider
    Status { provider: String },
}

fn init_tracing(config: &AppConfig, cli_level: Option<&str>) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RedactingWriter::stderr())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new()?,
    };
    let config = loader
        .load()
        .with_context(|| format!("failed to load {}", loader.path().display()))?;

    init_tracing(&config, cli.log_level.as_deref());

    let mut app = commands::App::open(config, cli.provider, cli.model)?;

    match cli.command {
        Command::Ask {
            video,
            question,
            title,
            transcript,
            new,
        } => {
            let video = commands::video_context(&video, title, transcript.as_deref())?;
            app.ask(video, &question, new).await
        }
        Command::Summarize {
            video,
            title,
            transcript,
            json,
        } => {
            let video = commands::video_context(&video, title, transcript.as_deref())?;
            app.summarize(video, json).await
        }
        Command::History { video, all } => app.history(&video, all).await,
        Command::List => app.list().await,
        Command::Delete { id } => app.delete(&id).await,
        Command::ClearAll => app.clear_all().await,
        Command::Key { action } => match action {
            KeyAction::Set { provider, api_key } => app.set_key(&provider, &api_key).await,
            KeyAction::Clear { provider } => app.clear_key(&provider).await,
            KeyAction::Status { provider } => app.key_status(&provider).await,
        },
    }
}
