use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod configuration;
mod error;

use configuration::Settings;

const DEFAULT_REQUEST: &str = "Please reset my password.";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output from the agent
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to voice-agent.toml in the working directory, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a text request to the agent
    Text {
        /// What to ask the agent
        #[arg(default_value = DEFAULT_REQUEST)]
        text: String,

        /// Also speak the reply into this WAV file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Answer a recorded request (WAV or raw 16-bit PCM) with a spoken reply
    Voice {
        /// Recording to answer
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the spoken reply
        #[arg(short, long, default_value = "reply.wav")]
        out: PathBuf,
    },

    /// Show the full conversation, including tool calls and their results
    Tools {
        /// What to ask the agent
        #[arg(default_value = DEFAULT_REQUEST)]
        text: String,
    },

    /// Describe the format of an audio file
    Inspect {
        /// File to inspect
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    Settings::load(config).context("Failed to load settings")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Command::Text { text, out } => {
            commands::text::execute(&load_settings(config)?, &text, out).await
        }
        Command::Voice { input, out } => {
            commands::voice::execute(&load_settings(config)?, &input, &out).await
        }
        Command::Tools { text } => commands::tools::execute(&load_settings(config)?, &text).await,
        Command::Inspect { file } => {
            // Inspection needs no API key, so incomplete settings fall back to the capture defaults
            let capture_format = Settings::load(config)
                .map(|settings| settings.audio.capture_format())
                .unwrap_or_default();
            commands::inspect::execute(&file, capture_format).await
        }
    }
}
