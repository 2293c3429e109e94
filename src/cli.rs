//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stencil - compose LLM prompts from template fragments
#[derive(Parser)]
#[command(
    name = "stencil",
    about = "Compose LLM prompts from template fragments",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline: resolve, expand includes, generate, expand snippets
    Compose {
        /// Composition expression, e.g. "(intro.md body.md)"
        templates: String,

        /// Show the generation input and system prompt without generating
        #[arg(long)]
        dry_run: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Maximum tokens for the generator
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Directory fragment ids are relative to
        #[arg(short, long)]
        base_dir: Option<PathBuf>,
    },

    /// Parse an expression and print its canonical form
    Parse {
        /// Composition expression
        templates: String,
    },

    /// Resolve an expression and expand includes, without generating
    Resolve {
        /// Composition expression
        templates: String,

        /// Directory fragment ids are relative to
        #[arg(short, long)]
        base_dir: Option<PathBuf>,
    },
}

/// Help footer pointing at the log file
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}

/// Location of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stencil")
        .join("logs")
        .join("stencil.log")
}
