//! Offline generator
//!
//! Echoes the prompt back followed by a short block showing directive usage.
//! The markers in that block are spaced out so they stay inert.

use async_trait::async_trait;
use tracing::debug;

use super::{GenerateError, Generator};

const TRAILER: &str = "\
<!-- simulated generation output -->
Directives available in generated text (remove the space after the first @):
- @ @snippet:example.txt@@ inserts a file's content
- @ @reference:docs/api.md@@ adds a reference comment
";

/// Generator that needs no network access
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedGenerator;

#[async_trait]
impl Generator for SimulatedGenerator {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn generate(&self, input: &str, max_tokens: Option<u32>) -> Result<String, GenerateError> {
        debug!(input_len = input.len(), ?max_tokens, "generate: called");
        Ok(format!("{}\n\n{}", input, TRAILER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::{DirectiveKind, directive};

    #[tokio::test]
    async fn test_echoes_input() {
        let out = SimulatedGenerator.generate("prompt body", None).await.unwrap();
        assert!(out.starts_with("prompt body\n\n"));
    }

    #[tokio::test]
    async fn test_trailer_has_no_live_directives() {
        let out = SimulatedGenerator.generate("", Some(10)).await.unwrap();
        assert!(!directive::contains(&out, DirectiveKind::Snippet));
        assert!(!directive::contains(&out, DirectiveKind::Reference));
    }
}
