//! Stencil configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolver::{DEFAULT_CACHE_TTL_SECS, DEFAULT_FALLBACK_PREFIX};

/// Environment variable supplying the remote endpoint when the config has none
pub const REMOTE_URL_ENV: &str = "STENCIL_REMOTE_URL";

/// Main Stencil configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template resolution settings
    pub resolver: ResolverConfig,

    /// Remote content store settings
    pub remote: RemoteConfig,

    /// Text generation settings
    pub generator: GeneratorConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the selected generator has the credentials it needs.
    pub fn validate(&self) -> Result<()> {
        if self.generator.provider == "anthropic" && std::env::var(&self.generator.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Generator API key not found. Set the {} environment variable.",
                self.generator.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .stencil.yml
        let local_config = PathBuf::from(".stencil.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/stencil/stencil.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("stencil").join("stencil.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Template resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory fragment ids are relative to (defaults to the working directory)
    #[serde(rename = "base-dir")]
    pub base_dir: Option<PathBuf>,

    /// How long resolved content stays cached
    #[serde(rename = "cache-ttl-secs")]
    pub cache_ttl_secs: u64,

    /// Ids starting with this prefix get generated placeholder content
    #[serde(rename = "fallback-prefix")]
    pub fallback_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            fallback_prefix: DEFAULT_FALLBACK_PREFIX.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Effective base directory
    pub fn base_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Failed to get current directory"),
        }
    }
}

/// Remote content store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// GraphQL endpoint; the remote source is disabled when unset
    pub endpoint: Option<String>,

    /// Environment variable containing a bearer token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: "STENCIL_REMOTE_TOKEN".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl RemoteConfig {
    /// Configured endpoint, or the `STENCIL_REMOTE_URL` override
    pub fn endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| std::env::var(REMOTE_URL_ENV).ok().filter(|e| !e.is_empty()))
    }

    /// Bearer token from the configured environment variable
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

/// Text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Provider name ("simulated" or "anthropic")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: "simulated".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

impl GeneratorConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} not set", self.api_key_env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.generator.provider, "simulated");
        assert_eq!(config.resolver.cache_ttl_secs, 300);
        assert_eq!(config.resolver.fallback_prefix, "fallback-");
        assert!(config.resolver.base_dir.is_none());
        assert!(config.remote.endpoint.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
resolver:
  base-dir: /srv/templates
  cache-ttl-secs: 60
  fallback-prefix: "demo-"

remote:
  endpoint: https://content.example.com/graphql
  token-env: MY_TOKEN
  timeout-ms: 5000

generator:
  provider: anthropic
  model: claude-haiku
  api-key-env: MY_API_KEY
  max-tokens: 2048
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.resolver.base_dir, Some(PathBuf::from("/srv/templates")));
        assert_eq!(config.resolver.cache_ttl_secs, 60);
        assert_eq!(config.resolver.fallback_prefix, "demo-");
        assert_eq!(config.remote.endpoint(), Some("https://content.example.com/graphql".to_string()));
        assert_eq!(config.remote.token_env, "MY_TOKEN");
        assert_eq!(config.remote.timeout_ms, 5000);
        assert_eq!(config.generator.provider, "anthropic");
        assert_eq!(config.generator.max_tokens, 2048);
        // Unspecified field keeps its default
        assert_eq!(config.generator.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
generator:
  model: claude-opus
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.generator.model, "claude-opus");
        assert_eq!(config.generator.provider, "simulated");
        assert_eq!(config.resolver.cache_ttl_secs, 300);
    }

    #[test]
    fn test_resolver_base_dir_explicit() {
        let config = ResolverConfig {
            base_dir: Some(PathBuf::from("/tmp/x")),
            ..Default::default()
        };
        assert_eq!(config.base_dir().unwrap(), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_resolver_base_dir_defaults_to_cwd() {
        let config = ResolverConfig::default();
        assert_eq!(config.base_dir().unwrap(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stencil.yml");
        fs::write(&path, "resolver:\n  cache-ttl-secs: 10\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.resolver.cache_ttl_secs, 10);
    }

    #[test]
    fn test_load_explicit_missing_file_errors() {
        let path = PathBuf::from("/nonexistent/stencil.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_remote_endpoint_env_override() {
        let config = RemoteConfig::default();
        unsafe { std::env::set_var(REMOTE_URL_ENV, "http://localhost:9999/graphql") };
        assert_eq!(config.endpoint(), Some("http://localhost:9999/graphql".to_string()));
        unsafe { std::env::remove_var(REMOTE_URL_ENV) };
        assert_eq!(config.endpoint(), None);
    }

    #[test]
    #[serial]
    fn test_remote_token_from_env() {
        let config = RemoteConfig {
            token_env: "STENCIL_TEST_TOKEN".to_string(),
            ..Default::default()
        };
        unsafe { std::env::set_var("STENCIL_TEST_TOKEN", "abc") };
        assert_eq!(config.token(), Some("abc".to_string()));
        unsafe { std::env::remove_var("STENCIL_TEST_TOKEN") };
        assert_eq!(config.token(), None);
    }

    #[test]
    #[serial]
    fn test_validate_requires_api_key_for_anthropic() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.generator.provider = "anthropic".to_string();
        config.generator.api_key_env = "STENCIL_TEST_MISSING_KEY".to_string();
        unsafe { std::env::remove_var("STENCIL_TEST_MISSING_KEY") };
        assert!(config.validate().is_err());
    }
}
