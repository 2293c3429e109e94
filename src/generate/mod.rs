//! Text generation boundary
//!
//! The composition pipeline hands the include-expanded prompt to a
//! [`Generator`] and post-processes whatever comes back. Generators are
//! opaque text-to-text transforms.

mod anthropic;
mod error;
mod simulated;

pub use anthropic::AnthropicGenerator;
pub use error::GenerateError;
pub use simulated::SimulatedGenerator;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::GeneratorConfig;

/// System prompt teaching the model the post-generation directive syntax
pub const SYSTEM_PROMPT: &str = "\
You are a document generation assistant. Process the provided content and produce \
well-structured output. You may use these directives in your output:

- @@snippet:id@@ inserts the content of the file `id` at that position after your response.
- @@reference:id@@ adds a reference comment, rendered as <!-- Reference: id -->.

Rules:
- Use @@snippet@@ and @@reference@@ directives where they help compose the document.
- Never emit @@include@@ directives; those are resolved before you see the content.
- Keep the output focused.

Your output is post-processed to expand these directives into the final document.";

/// An opaque text-to-text generation step
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short provider name for logging
    fn name(&self) -> &'static str;

    /// Generate output for the given input
    async fn generate(&self, input: &str, max_tokens: Option<u32>) -> Result<String, GenerateError>;
}

/// Create a generator based on the provider specified in config
///
/// Supports "simulated" and "anthropic" providers.
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generator>, GenerateError> {
    debug!(provider = %config.provider, model = %config.model, "create_generator: called");
    match config.provider.as_str() {
        "simulated" => Ok(Arc::new(SimulatedGenerator)),
        "anthropic" => Ok(Arc::new(AnthropicGenerator::from_config(config)?)),
        other => Err(GenerateError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Mock generator for unit tests
    pub struct MockGenerator {
        output: Option<String>,
        inputs: Mutex<Vec<String>>,
    }

    impl MockGenerator {
        /// Always return `output`
        pub fn replying(output: impl Into<String>) -> Self {
            Self {
                output: Some(output.into()),
                inputs: Mutex::new(Vec::new()),
            }
        }

        /// Always fail
        pub fn failing() -> Self {
            Self {
                output: None,
                inputs: Mutex::new(Vec::new()),
            }
        }

        pub fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for MockGenerator {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn generate(&self, input: &str, _max_tokens: Option<u32>) -> Result<String, GenerateError> {
            self.inputs.lock().unwrap().push(input.to_string());
            self.output.clone().ok_or_else(|| GenerateError::ApiError {
                status: 500,
                message: "mock failure".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::{DirectiveKind, directive};

    #[test]
    fn test_create_simulated() {
        let generator = create_generator(&GeneratorConfig::default()).unwrap();
        assert_eq!(generator.name(), "simulated");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = GeneratorConfig {
            provider: "nope".to_string(),
            ..Default::default()
        };
        let err = create_generator(&config).err().unwrap();
        assert!(matches!(err, GenerateError::UnknownProvider(ref name) if name == "nope"));
        assert!(err.to_string().contains("Unknown generator provider"));
    }

    #[test]
    fn test_system_prompt_describes_directives() {
        assert!(SYSTEM_PROMPT.contains("@@snippet:id@@"));
        assert!(SYSTEM_PROMPT.contains("@@reference:id@@"));
        assert!(!directive::contains(SYSTEM_PROMPT, DirectiveKind::Include));
    }
}
