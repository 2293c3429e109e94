//! Stencil - template composition for LLM prompts
//!
//! Stencil builds a prompt from named template fragments, hands it to a text
//! generator, and expands directives in what comes back.
//!
//! # Pipeline
//!
//! ```text
//! (intro.md (body.md footer.md))      composition expression
//!        │ parse
//!        ▼
//! Expression tree
//!        │ resolve: cache → fallback → remote store → filesystem
//!        ▼
//! initial content
//!        │ @@include:id@@ expansion (strict)
//!        ▼
//! generation input ──► Generator ──► generated text
//!                                        │ @@snippet:id@@, @@reference:id@@ expansion
//!                                        ▼
//!                                   final output
//! ```
//!
//! # Modules
//!
//! - [`expr`] - Expression tokenizer and parser
//! - [`resolver`] - Fragment lookup with TTL caching and remote store support
//! - [`expand`] - Include and snippet/reference directive passes
//! - [`generate`] - Generator trait, simulated and Anthropic implementations
//! - [`compose`] - Pipeline orchestration and result presentation
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod compose;
pub mod config;
pub mod expand;
pub mod expr;
pub mod generate;
pub mod resolver;

// Re-export commonly used types
pub use compose::{ComposeError, ComposeOptions, Composer, CompositionMetadata, CompositionResult, estimate_tokens};
pub use config::{Config, GeneratorConfig, RemoteConfig, ResolverConfig};
pub use expand::{Directive, DirectiveKind, InclusionError, IncludeExpander, SnippetError, SnippetExpander};
pub use expr::{Expression, ParseError};
pub use generate::{AnthropicGenerator, GenerateError, Generator, SimulatedGenerator};
pub use resolver::{ContentStore, GraphqlStore, RemoteDocument, RemoteError, ResolveError, Resolver, TemplateCache};
