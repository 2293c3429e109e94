//! Include pass
//!
//! Runs on resolved template content before generation. Every
//! `@@include:id@@` in the input is replaced with the verbatim text of
//! `base/id`. Included files may not contain include directives themselves.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::directive::{self, DirectiveKind};
use super::error::InclusionError;
use crate::resolver::fragment_path;

/// Expands include directives; one instance per in-flight request
#[derive(Debug, Default)]
pub struct IncludeExpander {
    /// Paths on the active expansion stack
    visited: HashSet<PathBuf>,
}

impl IncludeExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand every include directive found in `content`
    ///
    /// Only directives present in the input text are expanded.
    pub async fn expand(&mut self, content: &str, base: &Path) -> Result<String, InclusionError> {
        self.visited.clear();

        let directives = directive::scan(content, DirectiveKind::Include);
        debug!(count = directives.len(), base = %base.display(), "expand: called");
        if directives.is_empty() {
            return Ok(content.to_string());
        }

        let mut out = String::with_capacity(content.len());
        let mut last = 0;

        for d in &directives {
            let path = fragment_path(base, &d.id);
            if self.visited.contains(&path) {
                return Err(InclusionError::RecursiveInclusion { id: d.id.clone() });
            }
            self.visited.insert(path.clone());

            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(InclusionError::IncludeNotFound { id: d.id.clone() });
                }
                Err(e) => {
                    return Err(InclusionError::Io {
                        id: d.id.clone(),
                        source: e,
                    });
                }
            };

            if directive::contains(&text, DirectiveKind::Include) {
                return Err(InclusionError::RecursiveInclusion { id: d.id.clone() });
            }

            out.push_str(&content[last..d.span.start]);
            out.push_str(&text);
            last = d.span.end;
            self.visited.remove(&path);
        }

        out.push_str(&content[last..]);
        info!(count = directives.len(), "expand: includes inlined");
        Ok(out)
    }
}
