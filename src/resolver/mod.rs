//! Template content resolution
//!
//! Each atom in a composition expression names a template fragment. The
//! resolver looks fragments up through a fixed chain of sources:
//!
//! 1. In-memory cache (TTL bound)
//! 2. Fallback convention: ids with the fallback prefix get generated text
//! 3. Remote content store, when configured (failures are logged and skipped)
//! 4. Local filesystem under the base directory
//!
//! Lists resolve element by element and are joined with a blank line.

mod cache;
mod remote;

pub use cache::{CacheEntry, CacheEntryStats, CacheStats, DEFAULT_CACHE_TTL_SECS, TemplateCache};
#[cfg(test)]
pub use remote::mock;
pub use remote::{ContentStore, GraphqlStore, RemoteDocument, RemoteError};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::expr::Expression;

/// Default prefix marking ids served by the fallback convention
pub const DEFAULT_FALLBACK_PREFIX: &str = "fallback-";

/// Separator placed between resolved list elements
const LIST_SEPARATOR: &str = "\n\n";

/// Errors produced while resolving template content
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Template not found: {id} (checked {sources})")]
    TemplateNotFound { id: String, sources: String },

    #[error("Failed to read template {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: io::Error,
    },
}

/// Path of a fragment id relative to a base directory
///
/// Leading separators are ignored so an id never escapes to an absolute path.
pub fn fragment_path(base: &Path, id: &str) -> PathBuf {
    base.join(id.trim_start_matches(['/', '\\']))
}

/// Resolves expressions to text through the cache/fallback/remote/filesystem chain
pub struct Resolver {
    cache: TemplateCache,
    store: Option<Arc<dyn ContentStore>>,
    fallback_prefix: String,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL_SECS)
    }
}

impl Resolver {
    /// Create a resolver with no remote store
    pub fn new(cache_ttl_secs: u64) -> Self {
        Self {
            cache: TemplateCache::new(cache_ttl_secs),
            store: None,
            fallback_prefix: DEFAULT_FALLBACK_PREFIX.to_string(),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.cache_ttl_secs).with_fallback_prefix(config.fallback_prefix.clone())
    }

    /// Attach a remote content store
    pub fn with_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_fallback_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fallback_prefix = prefix.into();
        self
    }

    pub fn fallback_prefix(&self) -> &str {
        &self.fallback_prefix
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        debug!("clear_cache: called");
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve an expression to text
    pub fn resolve<'a>(&'a mut self, expr: &'a Expression, base: &'a Path) -> BoxFuture<'a, Result<String, ResolveError>> {
        async move {
            match expr {
                Expression::Atom(id) => self.resolve_atom(id, base).await,
                Expression::List(elements) => {
                    let mut parts = Vec::with_capacity(elements.len());
                    for element in elements {
                        parts.push(self.resolve(element, base).await?);
                    }
                    Ok(parts.join(LIST_SEPARATOR))
                }
            }
        }
        .boxed()
    }

    /// Resolve a single fragment id
    pub async fn resolve_atom(&mut self, id: &str, base: &Path) -> Result<String, ResolveError> {
        debug!(%id, base = %base.display(), "resolve_atom: called");

        if let Some(content) = self.cache.get(id) {
            debug!(%id, "resolve_atom: cache hit");
            return Ok(content.to_string());
        }

        if id.starts_with(&self.fallback_prefix) {
            debug!(%id, "resolve_atom: fallback convention");
            return Ok(fallback_content(id, base));
        }

        if let Some(store) = &self.store {
            match store.fetch(id).await {
                Ok(Some(doc)) => match doc.content() {
                    Some(content) => {
                        debug!(%id, revision = ?doc.revision, "resolve_atom: remote hit");
                        let content = content.to_string();
                        self.cache.insert(id, content.clone(), doc.revision.clone());
                        return Ok(content);
                    }
                    None => debug!(%id, "resolve_atom: remote document empty"),
                },
                Ok(None) => debug!(%id, "resolve_atom: remote miss"),
                Err(e) => warn!(%id, error = %e, "resolve_atom: remote store failed, trying filesystem"),
            }
        }

        let path = fragment_path(base, id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(%id, path = %path.display(), "resolve_atom: filesystem hit");
                self.cache.insert(id, content.clone(), None);
                Ok(content)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ResolveError::TemplateNotFound {
                id: id.to_string(),
                sources: self.sources_checked(),
            }),
            Err(e) => Err(ResolveError::Io {
                id: id.to_string(),
                source: e,
            }),
        }
    }

    fn sources_checked(&self) -> String {
        if self.store.is_some() {
            "cache, remote store, and filesystem".to_string()
        } else {
            "cache and filesystem".to_string()
        }
    }
}

/// Deterministic placeholder text for fallback ids
pub fn fallback_content(id: &str, base: &Path) -> String {
    format!(
        "<!-- Fallback content for {id} -->\n\
         This is a fallback template that would normally be replaced with actual content.\n\
         Template path: {id}\n\
         Base path: {}",
        base.display()
    )
}

#[cfg(test)]
mod tests {
    use super::mock::MockContentStore;
    use super::*;
    use chrono::{TimeDelta, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn fixture(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_resolve_atom_from_filesystem() {
        let dir = fixture(&[("intro.md", "Hello")]);
        let mut resolver = Resolver::default();

        let content = resolver.resolve(&Expression::atom("intro.md"), dir.path()).await.unwrap();
        assert_eq!(content, "Hello");
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_list_joins_with_blank_line() {
        let dir = fixture(&[("a.md", "A"), ("b.md", "B"), ("c.md", "C")]);
        let mut resolver = Resolver::default();
        let expr = crate::expr::parse("(a.md (b.md c.md))").unwrap();

        let content = resolver.resolve(&expr, dir.path()).await.unwrap();
        assert_eq!(content, "A\n\nB\n\nC");
    }

    #[tokio::test]
    async fn test_resolve_nested_path() {
        let dir = fixture(&[("sections/one.md", "One")]);
        let mut resolver = Resolver::default();

        let content = resolver.resolve_atom("sections/one.md", dir.path()).await.unwrap();
        assert_eq!(content, "One");
    }

    #[tokio::test]
    async fn test_unexpired_cache_wins_over_filesystem() {
        let dir = fixture(&[("a.md", "from disk")]);
        let mut resolver = Resolver::default();
        resolver.cache.insert("a.md", "from cache", None);

        let content = resolver.resolve_atom("a.md", dir.path()).await.unwrap();
        assert_eq!(content, "from cache");
    }

    #[tokio::test]
    async fn test_expired_cache_rereads_filesystem_and_recaches() {
        let dir = fixture(&[("a.md", "from disk")]);
        let mut resolver = Resolver::default();
        let stale = Utc::now() - TimeDelta::seconds(600);
        resolver
            .cache
            .insert_at("a.md".to_string(), "from cache".to_string(), None, stale);

        let content = resolver.resolve_atom("a.md", dir.path()).await.unwrap();
        assert_eq!(content, "from disk");

        let entry = resolver.cache().entry("a.md").unwrap();
        assert_eq!(entry.content, "from disk");
        assert!(entry.timestamp > stale);
    }

    #[tokio::test]
    async fn test_fallback_id_needs_no_files() {
        let mut resolver = Resolver::default();
        let base = Path::new("/definitely/not/a/real/dir");

        let content = resolver.resolve_atom("fallback-intro", base).await.unwrap();
        assert!(content.starts_with("<!-- Fallback content for fallback-intro -->"));
        assert!(content.contains("Template path: fallback-intro"));
        assert!(content.contains("Base path: /definitely/not/a/real/dir"));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_custom_fallback_prefix() {
        let mut resolver = Resolver::default().with_fallback_prefix("demo:");
        let content = resolver.resolve_atom("demo:x", Path::new(".")).await.unwrap();
        assert!(content.contains("Fallback content for demo:x"));
    }

    #[tokio::test]
    async fn test_remote_store_preferred_over_filesystem() {
        let dir = fixture(&[("doc", "from disk")]);
        let store = Arc::new(MockContentStore::new().with_document("doc", Some("rendered"), Some("markup")));
        let mut resolver = Resolver::default().with_store(store.clone());

        let content = resolver.resolve_atom("doc", dir.path()).await.unwrap();
        assert_eq!(content, "rendered");
        assert_eq!(resolver.cache().entry("doc").unwrap().revision.as_deref(), Some("sha-doc"));

        // Second lookup is served from the cache
        resolver.resolve_atom("doc", dir.path()).await.unwrap();
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_markup_used_without_rendered() {
        let store = Arc::new(MockContentStore::new().with_document("doc", None, Some("markup")));
        let mut resolver = Resolver::default().with_store(store);

        let content = resolver.resolve_atom("doc", Path::new(".")).await.unwrap();
        assert_eq!(content, "markup");
    }

    #[tokio::test]
    async fn test_remote_failure_falls_through_to_filesystem() {
        let dir = fixture(&[("doc", "from disk")]);
        let store = Arc::new(MockContentStore::new().with_status("doc", 500));
        let mut resolver = Resolver::default().with_store(store.clone());

        let content = resolver.resolve_atom("doc", dir.path()).await.unwrap();
        assert_eq!(content, "from disk");
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_empty_document_falls_through() {
        let dir = fixture(&[("doc", "from disk")]);
        let store = Arc::new(MockContentStore::new().with_document("doc", Some(""), None));
        let mut resolver = Resolver::default().with_store(store);

        let content = resolver.resolve_atom("doc", dir.path()).await.unwrap();
        assert_eq!(content, "from disk");
    }

    #[tokio::test]
    async fn test_fallback_skips_remote_store() {
        let store = Arc::new(MockContentStore::new());
        let mut resolver = Resolver::default().with_store(store.clone());

        resolver.resolve_atom("fallback-x", Path::new(".")).await.unwrap();
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_not_found_names_sources() {
        let dir = fixture(&[]);
        let mut resolver = Resolver::default();

        let err = resolver.resolve_atom("missing.md", dir.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::TemplateNotFound { ref id, .. } if id == "missing.md"));
        assert_eq!(err.to_string(), "Template not found: missing.md (checked cache and filesystem)");
    }

    #[tokio::test]
    async fn test_not_found_with_store_names_remote() {
        let dir = fixture(&[]);
        let mut resolver = Resolver::default().with_store(Arc::new(MockContentStore::new()));

        let err = resolver.resolve_atom("missing.md", dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("remote store"));
    }

    #[tokio::test]
    async fn test_non_not_found_io_error_propagates() {
        let dir = fixture(&[]);
        fs::create_dir(dir.path().join("a-directory")).unwrap();
        let mut resolver = Resolver::default();

        let err = resolver.resolve_atom("a-directory", dir.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Io { .. }));
    }

    #[tokio::test]
    async fn test_list_aborts_on_first_missing_element() {
        let dir = fixture(&[("a.md", "A")]);
        let mut resolver = Resolver::default();
        let expr = crate::expr::parse("(a.md nope.md)").unwrap();

        assert!(resolver.resolve(&expr, dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let dir = fixture(&[("a.md", "A")]);
        let mut resolver = Resolver::default();
        resolver.resolve_atom("a.md", dir.path()).await.unwrap();
        assert_eq!(resolver.cache_stats().size, 1);

        resolver.clear_cache();
        assert_eq!(resolver.cache_stats().size, 0);
    }

    #[test]
    fn test_fragment_path_strips_leading_separator() {
        assert_eq!(fragment_path(Path::new("/base"), "/etc/x"), PathBuf::from("/base/etc/x"));
        assert_eq!(fragment_path(Path::new("/base"), "a/b.md"), PathBuf::from("/base/a/b.md"));
    }
}
