//! The collector abstraction and the registry the search engine reads from.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            CollectorRegistry             │
//! │  ┌─────────┐ ┌─────────┐ ┌────────────┐  │
//! │  │  Drive  │ │ GitHub  │ │   Local    │  │
//! │  └─────────┘ └─────────┘ └────────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     SearchEngine → normalize → score → rank
//! ```
//!
//! Collectors that cannot be constructed (missing credentials, missing
//! root directory) are recorded as unavailable instead of failing the
//! whole registry.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::models::{RawRecord, SourceKind};

// ═══════════════════════════════════════════════════════════════════════
// Collector Trait
// ═══════════════════════════════════════════════════════════════════════

/// One storage backend that lists reference files.
///
/// A collector keeps the listing from its last refresh and hands it out
/// on request; the search engine only triggers a refresh when that listing
/// is empty.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use chrono::{DateTime, Utc};
/// use refharness::models::{RawRecord, SourceKind};
/// use refharness::traits::Collector;
///
/// struct FixedListing(Vec<RawRecord>);
///
/// #[async_trait]
/// impl Collector for FixedListing {
///     fn kind(&self) -> SourceKind { SourceKind::Local }
///     fn description(&self) -> &str { "A fixed in-memory listing" }
///     fn cached_files(&self) -> Vec<RawRecord> { self.0.clone() }
///     async fn refresh(&self) -> Result<usize> { Ok(self.0.len()) }
///     fn last_refresh(&self) -> Option<DateTime<Utc>> { None }
/// }
/// ```
#[async_trait]
pub trait Collector: Send + Sync {
    /// Which backend this collector reads.
    fn kind(&self) -> SourceKind;

    /// One-line description, shown by `refs status`.
    fn description(&self) -> &str;

    /// Records cached by the last refresh; empty if never refreshed.
    fn cached_files(&self) -> Vec<RawRecord>;

    /// Re-list the backend and replace the cache.
    ///
    /// Returns the number of records now cached.
    async fn refresh(&self) -> Result<usize>;

    /// Number of cached records.
    fn count(&self) -> usize {
        self.cached_files().len()
    }

    /// When the cache was last refreshed, if ever.
    fn last_refresh(&self) -> Option<DateTime<Utc>>;
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// A backend that is configured but could not be constructed.
#[derive(Debug, Clone)]
pub struct Unavailable {
    pub kind: SourceKind,
    pub reason: String,
}

/// The set of collectors available to a search engine.
///
/// Use [`CollectorRegistry::from_config`] for the built-in backends, or
/// [`register`](CollectorRegistry::register) to inject your own (tests use
/// in-memory fakes).
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
    unavailable: Vec<Unavailable>,
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    /// Build every configured backend, downgrading construction failures
    /// to [`Unavailable`] entries.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_drive::DriveCollector;
        use crate::connector_fs::LocalCollector;
        use crate::connector_github::GithubCollector;

        let mut registry = Self::new();
        let cache_dir = &config.cache.dir;

        if let Some(cfg) = &config.sources.drive {
            registry.register_result(
                SourceKind::CloudStore,
                DriveCollector::new(cfg.clone(), cache_dir)
                    .map(|c| Box::new(c) as Box<dyn Collector>),
            );
        }
        if let Some(cfg) = &config.sources.github {
            registry.register_result(
                SourceKind::VersionControl,
                GithubCollector::new(cfg.clone(), cache_dir)
                    .map(|c| Box::new(c) as Box<dyn Collector>),
            );
        }
        if let Some(cfg) = &config.sources.local {
            registry.register_result(
                SourceKind::Local,
                LocalCollector::new(cfg.clone(), cache_dir)
                    .map(|c| Box::new(c) as Box<dyn Collector>),
            );
        }

        registry
    }

    fn register_result(&mut self, kind: SourceKind, built: Result<Box<dyn Collector>>) {
        match built {
            Ok(collector) => self.register(collector),
            Err(e) => {
                tracing::warn!(source = %kind, error = %e, "source unavailable");
                self.unavailable.push(Unavailable {
                    kind,
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    /// Register a collector. A later collector for the same backend
    /// replaces the earlier one.
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        let kind = collector.kind();
        self.collectors.retain(|c| c.kind() != kind);
        self.unavailable.retain(|u| u.kind != kind);
        self.collectors.push(collector);
    }

    /// Get all registered collectors.
    pub fn collectors(&self) -> &[Box<dyn Collector>] {
        &self.collectors
    }

    /// Find the collector for one backend.
    pub fn find(&self, kind: SourceKind) -> Option<&dyn Collector> {
        self.collectors
            .iter()
            .find(|c| c.kind() == kind)
            .map(|c| c.as_ref())
    }

    /// Backends that were configured but failed to initialize.
    pub fn unavailable(&self) -> &[Unavailable] {
        &self.unavailable
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Return the count of registered collectors.
    pub fn len(&self) -> usize {
        self.collectors.len()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    struct Fixed(SourceKind, usize);

    #[async_trait]
    impl Collector for Fixed {
        fn kind(&self) -> SourceKind {
            self.0
        }
        fn description(&self) -> &str {
            "fixed"
        }
        fn cached_files(&self) -> Vec<RawRecord> {
            vec![RawRecord::new(); self.1]
        }
        async fn refresh(&self) -> Result<usize> {
            Ok(self.1)
        }
        fn last_refresh(&self) -> Option<DateTime<Utc>> {
            None
        }
    }

    #[test]
    fn register_replaces_same_kind() {
        let mut registry = CollectorRegistry::new();
        registry.register(Box::new(Fixed(SourceKind::Local, 1)));
        registry.register(Box::new(Fixed(SourceKind::CloudStore, 2)));
        registry.register(Box::new(Fixed(SourceKind::Local, 3)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find(SourceKind::Local).unwrap().count(), 3);
        assert!(registry.find(SourceKind::VersionControl).is_none());
    }

    #[test]
    fn unconstructible_sources_are_unavailable_not_fatal() {
        let config = parse_config(
            r#"
[sources.drive]
folder_id = "abc"
token_env = "REFHARNESS_TEST_TOKEN_THAT_IS_NEVER_SET"

[sources.local]
root = "/definitely/not/a/real/dir"
"#,
        )
        .unwrap();
        let registry = CollectorRegistry::from_config(&config);

        assert!(registry.is_empty());
        let kinds: Vec<_> = registry.unavailable().iter().map(|u| u.kind).collect();
        assert_eq!(kinds, vec![SourceKind::CloudStore, SourceKind::Local]);
    }

    #[test]
    fn empty_config_builds_empty_registry() {
        let registry = CollectorRegistry::from_config(&Config::default());
        assert!(registry.is_empty());
        assert!(registry.unavailable().is_empty());
    }
}
