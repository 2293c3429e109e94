//! Composition pipeline
//!
//! ```text
//! expression text ─ parse ─ resolve ─ include pass ─ generate ─ snippet pass ─ final output
//! ```
//!
//! Every stage error is caught here and reported as a failed
//! [`CompositionResult`]; nothing escapes [`Composer::execute`].

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use eyre::Context;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::expand::{InclusionError, IncludeExpander, SnippetError, SnippetExpander};
use crate::expr::{self, ParseError};
use crate::generate::{self, GenerateError, Generator, SYSTEM_PROMPT};
use crate::resolver::{GraphqlStore, ResolveError, Resolver};

/// Any failure along the pipeline
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Inclusion(#[from] InclusionError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Snippet(#[from] SnippetError),
}

/// Caller options for a composition run
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Stop after the include pass and show what would be sent for generation
    pub dry_run: bool,
    /// Present the result as JSON
    pub json: bool,
    /// Upper bound passed to the generator
    pub max_tokens: Option<u32>,
}

/// Outcome of one composition run
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompositionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CompositionMetadata>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompositionMetadata {
    /// Content handed to the generator
    pub pre_processed_content: String,
    /// Final output after the snippet pass (absent on dry runs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_processed_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
}

impl CompositionResult {
    fn completed(pre_processed: String, final_output: String) -> Self {
        let token_count = estimate_tokens(&final_output);
        Self {
            success: true,
            final_output: Some(final_output.clone()),
            error: None,
            metadata: Some(CompositionMetadata {
                pre_processed_content: pre_processed,
                post_processed_content: Some(final_output),
                token_count: Some(token_count),
            }),
        }
    }

    fn dry_run(pre_processed: String) -> Self {
        let token_count = estimate_tokens(&pre_processed);
        Self {
            success: true,
            final_output: None,
            error: None,
            metadata: Some(CompositionMetadata {
                pre_processed_content: pre_processed,
                post_processed_content: None,
                token_count: Some(token_count),
            }),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            final_output: None,
            error: Some(message),
            metadata: None,
        }
    }
}

/// Rough token estimate: four characters per token, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Build a resolver from configuration, attaching the remote store if one is configured
pub fn build_resolver(config: &Config) -> eyre::Result<Resolver> {
    let resolver = Resolver::from_config(&config.resolver);
    match GraphqlStore::from_config(&config.remote).context("Failed to create remote store")? {
        Some(store) => {
            info!("Remote content store enabled");
            Ok(resolver.with_store(Arc::new(store)))
        }
        None => Ok(resolver),
    }
}

/// Runs the composition pipeline
///
/// The resolver cache lives as long as the composer. Expanders are created
/// fresh for every run.
pub struct Composer {
    resolver: Resolver,
    generator: Arc<dyn Generator>,
    base_dir: PathBuf,
}

impl Composer {
    pub fn new(resolver: Resolver, generator: Arc<dyn Generator>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            generator,
            base_dir: base_dir.into(),
        }
    }

    /// Wire up resolver, remote store and generator from configuration
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let resolver = build_resolver(config)?;
        let generator = generate::create_generator(&config.generator).context("Failed to create generator")?;
        let base_dir = config.resolver.base_dir()?;

        Ok(Self::new(resolver, generator, base_dir))
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Run the full pipeline, converting any failure into a failed result
    pub async fn execute(&mut self, templates: &str, options: &ComposeOptions) -> CompositionResult {
        debug!(?options, "execute: called");
        match self.run(templates, options).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "execute: composition failed");
                CompositionResult::failure(e.to_string())
            }
        }
    }

    /// Parse, resolve and expand includes, producing the generation input
    pub async fn prepare(&mut self, templates: &str) -> Result<String, ComposeError> {
        let expression = expr::parse(templates)?;
        debug!(fragments = ?expression.atoms(), "prepare: parsed");
        let initial = self.resolver.resolve(&expression, &self.base_dir).await?;
        debug!(initial_len = initial.len(), "prepare: resolved");

        let mut includes = IncludeExpander::new();
        Ok(includes.expand(&initial, &self.base_dir).await?)
    }

    async fn run(&mut self, templates: &str, options: &ComposeOptions) -> Result<CompositionResult, ComposeError> {
        let prompt = self.prepare(templates).await?;

        if options.dry_run {
            info!(prompt_len = prompt.len(), "run: dry run, skipping generation");
            return Ok(CompositionResult::dry_run(prompt));
        }

        info!(generator = self.generator.name(), prompt_len = prompt.len(), "run: generating");
        let generated = self.generator.generate(&prompt, options.max_tokens).await?;

        let mut snippets = SnippetExpander::new().with_fallback_prefix(self.resolver.fallback_prefix());
        let final_output = snippets.expand(&generated, &self.base_dir).await?;

        info!(output_len = final_output.len(), "run: composition complete");
        Ok(CompositionResult::completed(prompt, final_output))
    }
}

/// Write a result the way the CLI shows it
pub fn present<W: Write, E: Write>(
    result: &CompositionResult,
    options: &ComposeOptions,
    out: &mut W,
    err: &mut E,
) -> io::Result<()> {
    if options.json {
        let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
        return writeln!(out, "{}", json);
    }

    if !result.success {
        let message = result.error.as_deref().unwrap_or("unknown error");
        return writeln!(err, "{} {}", "Error:".red(), message);
    }

    if options.dry_run {
        let prompt = result
            .metadata
            .as_ref()
            .map(|m| m.pre_processed_content.as_str())
            .unwrap_or_default();
        writeln!(out, "=== DRY RUN: generation input ===")?;
        writeln!(out, "{}", prompt)?;
        writeln!(out)?;
        writeln!(out, "=== System prompt ===")?;
        return writeln!(out, "{}", SYSTEM_PROMPT);
    }

    writeln!(out, "{}", result.final_output.as_deref().unwrap_or_default())
}
