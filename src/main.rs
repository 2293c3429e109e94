//! Stencil - template composition CLI
//!
//! CLI entry point for composing, parsing and resolving template expressions.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use stencil::cli::{Cli, Command, generate_after_help, get_log_path};
use stencil::compose::{self, ComposeOptions, Composer};
use stencil::config::Config;
use stencil::expand::IncludeExpander;
use stencil::expr;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Write to log file, stdout carries command output
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Build command with the log location in the help footer
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "Stencil loaded config: provider={}, model={}",
        config.generator.provider, config.generator.model
    );

    let ok = match cli.command {
        Command::Compose {
            templates,
            dry_run,
            json,
            max_tokens,
            base_dir,
        } => {
            let options = ComposeOptions {
                dry_run,
                json,
                max_tokens,
            };
            cmd_compose(&config, &templates, &options, base_dir).await?
        }
        Command::Parse { templates } => cmd_parse(&templates),
        Command::Resolve { templates, base_dir } => cmd_resolve(&config, &templates, base_dir, cli.verbose).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Run the full composition pipeline
async fn cmd_compose(
    config: &Config,
    templates: &str,
    options: &ComposeOptions,
    base_dir: Option<PathBuf>,
) -> Result<bool> {
    if !options.dry_run {
        config.validate().context("Invalid configuration")?;
    }

    let mut composer = Composer::from_config(config)?;
    if let Some(dir) = base_dir {
        composer = composer.with_base_dir(dir);
    }

    let result = composer.execute(templates, options).await;
    compose::present(&result, options, &mut io::stdout(), &mut io::stderr()).context("Failed to write output")?;

    Ok(result.success)
}

/// Print the canonical form of an expression
fn cmd_parse(templates: &str) -> bool {
    match expr::parse(templates) {
        Ok(expression) => {
            println!("{}", expression);
            true
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            false
        }
    }
}

/// Resolve an expression and expand includes without generating
async fn cmd_resolve(config: &Config, templates: &str, base_dir: Option<PathBuf>, verbose: bool) -> Result<bool> {
    let base = match base_dir {
        Some(dir) => dir,
        None => config.resolver.base_dir()?,
    };

    let expression = match expr::parse(templates) {
        Ok(expression) => expression,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            return Ok(false);
        }
    };

    let mut resolver = compose::build_resolver(config)?;
    let initial = match resolver.resolve(&expression, &base).await {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            return Ok(false);
        }
    };

    let mut includes = IncludeExpander::new();
    match includes.expand(&initial, &base).await {
        Ok(content) => {
            println!("{}", content);
            if verbose {
                let stats = serde_json::to_string_pretty(&resolver.cache_stats())?;
                eprintln!("{} {}", "Cache:".dimmed(), stats);
            }
            Ok(true)
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            Ok(false)
        }
    }
}
