//! promptloom - compose prompts with inline reference images and generate
//!
//! Usage:
//!   promptloom generate "a paper fox in the snow" --image sketch.png --count 3
//!   promptloom analyze-prompt "a paper fox in the snow"
//!   promptloom analyze-image photo.jpg
//!   promptloom settings --init

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::error::CliError;

/// Prompt workbench for Gemini-style and OpenAI-style image backends
#[derive(Parser, Debug)]
#[command(name = "promptloom")]
#[command(about = "Compose multimodal prompts and generate images")]
struct Cli {
    /// Directory holding settings.json (defaults to the user config dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate images from a prompt and optional attachments
    Generate(GenerateArgs),

    /// Critique a prompt and suggest an improved one
    AnalyzePrompt {
        prompt: String,
        /// Replace the default instruction header
        #[arg(long)]
        instruction: Option<String>,
    },

    /// Describe an image as a reusable prompt
    AnalyzeImage {
        path: PathBuf,
        /// Replace the default instruction header
        #[arg(long)]
        instruction: Option<String>,
    },

    /// Show the resolved settings with keys masked
    Settings {
        /// Write a default settings file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Prompt text
    #[arg(default_value = "")]
    pub prompt: String,

    /// Image attached after the prompt text (repeatable)
    #[arg(long = "image", short = 'i')]
    pub images: Vec<PathBuf>,

    /// Reference image sent ahead of the prompt
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Things to keep out of the image
    #[arg(long, default_value = "")]
    pub negative: String,

    /// Output size: 1K, 2K or 4K
    #[arg(long)]
    pub size: Option<String>,

    /// Aspect ratio such as 16:9, or auto
    #[arg(long)]
    pub aspect: Option<String>,

    /// Number of attempts (1-8)
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: u32,

    /// Directory for generated images
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

fn data_dir(cli: &Cli) -> Result<PathBuf, CliError> {
    match &cli.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => dirs::config_dir()
            .map(|dir| dir.join("promptloom"))
            .ok_or(CliError::NoDataDir),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let data_dir = data_dir(&cli)?;

    match cli.command {
        Command::Generate(args) => commands::generate(&data_dir, args).await,
        Command::AnalyzePrompt {
            prompt,
            instruction,
        } => commands::analyze_prompt(&data_dir, &prompt, instruction.as_deref()).await,
        Command::AnalyzeImage { path, instruction } => {
            commands::analyze_image(&data_dir, &path, instruction.as_deref()).await
        }
        Command::Settings { init } => commands::settings(&data_dir, init).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
