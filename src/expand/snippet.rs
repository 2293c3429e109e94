//! Snippet and reference pass
//!
//! Runs on generated text. `@@snippet:id@@` is replaced with the contents of
//! `base/id` under the same rules as includes. Afterwards every
//! `@@reference:id@@` becomes a fixed comment marker without touching disk.
//!
//! When the base path carries the fallback prefix, a missing snippet stops
//! the sweep and the partially expanded text is returned instead of failing.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::directive::{self, DirectiveKind};
use super::error::SnippetError;
use crate::resolver::{DEFAULT_FALLBACK_PREFIX, fragment_path};

/// Marker text a reference directive is replaced with
pub fn reference_marker(id: &str) -> String {
    format!("<!-- Reference: {} -->", id)
}

/// Replace every reference directive with its marker
pub fn expand_references(content: &str) -> String {
    let directives = directive::scan(content, DirectiveKind::Reference);
    if directives.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for d in &directives {
        out.push_str(&content[last..d.span.start]);
        out.push_str(&reference_marker(&d.id));
        last = d.span.end;
    }
    out.push_str(&content[last..]);
    out
}

/// Expands snippet and reference directives; one instance per in-flight request
#[derive(Debug)]
pub struct SnippetExpander {
    /// Paths on the active expansion stack
    visited: HashSet<PathBuf>,
    fallback_prefix: String,
}

impl Default for SnippetExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetExpander {
    pub fn new() -> Self {
        Self {
            visited: HashSet::new(),
            fallback_prefix: DEFAULT_FALLBACK_PREFIX.to_string(),
        }
    }

    pub fn with_fallback_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fallback_prefix = prefix.into();
        self
    }

    /// Expand snippets, then references
    pub async fn expand(&mut self, content: &str, base: &Path) -> Result<String, SnippetError> {
        self.visited.clear();
        let expanded = self.expand_snippets(content, base).await?;
        Ok(expand_references(&expanded))
    }

    fn is_fallback_base(&self, base: &Path) -> bool {
        base.to_string_lossy().starts_with(&self.fallback_prefix)
    }

    async fn expand_snippets(&mut self, content: &str, base: &Path) -> Result<String, SnippetError> {
        let directives = directive::scan(content, DirectiveKind::Snippet);
        debug!(count = directives.len(), base = %base.display(), "expand_snippets: called");
        if directives.is_empty() {
            return Ok(content.to_string());
        }

        let soft_missing = self.is_fallback_base(base);
        let mut out = String::with_capacity(content.len());
        let mut last = 0;

        for d in &directives {
            let path = fragment_path(base, &d.id);
            if self.visited.contains(&path) {
                return Err(SnippetError::RecursiveSnippet { id: d.id.clone() });
            }

            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    if soft_missing {
                        warn!(id = %d.id, "expand_snippets: snippet missing under fallback base, returning partial output");
                        break;
                    }
                    return Err(SnippetError::SnippetNotFound { id: d.id.clone() });
                }
                Err(e) => {
                    return Err(SnippetError::Io {
                        id: d.id.clone(),
                        source: e,
                    });
                }
            };
            self.visited.insert(path.clone());

            if directive::contains(&text, DirectiveKind::Snippet) {
                return Err(SnippetError::RecursiveSnippet { id: d.id.clone() });
            }

            out.push_str(&content[last..d.span.start]);
            out.push_str(&text);
            last = d.span.end;
            self.visited.remove(&path);
        }

        out.push_str(&content[last..]);
        info!(count = directives.len(), "expand_snippets: done");
        Ok(out)
    }
}
