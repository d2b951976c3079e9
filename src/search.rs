//! The search engine: fetch, normalize, score, rank, truncate.
//!
//! # Pipeline
//!
//! 1. Resolve the source selector against the registered collectors.
//! 2. Read every selected collector's cache concurrently; an empty cache
//!    triggers one refresh. A failed refresh drops that source only.
//! 3. Normalize raw records into [`UnifiedRecord`]s.
//! 4. Score and filter against the criteria.
//! 5. Rank, then truncate to the limit.
//!
//! Nothing computed here outlives the call: records and scores are built
//! fresh every time.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::metadata::{MetadataExtractor, Supervisor};
use crate::models::{
    Criteria, RawRecord, SourceKind, SourceSelector, UnifiedRecord, UNKNOWN_AUTHOR,
};
use crate::normalize::normalize_all;
use crate::ranking::rank;
use crate::scoring::RelevanceScorer;
use crate::stats::format_bytes;
use crate::traits::{Collector, CollectorRegistry};

/// Bucket used in statistics for records without a year.
pub const UNKNOWN_YEAR: &str = "Unknown";

/// Aggregate counts over every reference the engine can see.
///
/// Each breakdown sums to `total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceStats {
    pub total: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_year: BTreeMap<String, usize>,
    pub by_author: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

impl ReferenceStats {
    fn from_records(records: &[UnifiedRecord]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };
        for r in records {
            *stats.by_source.entry(r.source.label().to_string()).or_default() += 1;
            let year = r
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| UNKNOWN_YEAR.to_string());
            *stats.by_year.entry(year).or_default() += 1;
            *stats.by_author.entry(r.author.clone()).or_default() += 1;
            *stats.by_type.entry(r.kind.clone()).or_default() += 1;
        }
        stats
    }
}

pub struct SearchEngine {
    registry: CollectorRegistry,
    extractor: MetadataExtractor,
    scorer: RelevanceScorer,
    stats_limit: i64,
}

impl SearchEngine {
    /// Build an engine over explicitly provided collectors.
    pub fn new(registry: CollectorRegistry, supervisor: Supervisor, stats_limit: i64) -> Self {
        Self {
            registry,
            extractor: MetadataExtractor::new(supervisor.clone()),
            scorer: RelevanceScorer::new(supervisor),
            stats_limit,
        }
    }

    /// Build an engine over every backend the config describes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CollectorRegistry::from_config(config),
            config.supervisor.to_supervisor(),
            config.search.stats_limit,
        )
    }

    pub fn registry(&self) -> &CollectorRegistry {
        &self.registry
    }

    /// Search the selected sources.
    ///
    /// `sources` is `all` or one source name (`drive`, `github`, `local`).
    /// A `limit` of zero or less yields an empty list.
    ///
    /// # Errors
    ///
    /// Only [`SearchError::UnknownSource`](crate::error::SearchError::UnknownSource)
    /// for an unrecognized `sources` value. Collector and record failures
    /// are logged and contained.
    pub async fn search(
        &self,
        sources: &str,
        criteria: &Criteria,
        limit: i64,
    ) -> Result<Vec<UnifiedRecord>> {
        let selector: SourceSelector = sources.parse()?;
        Ok(self.search_selected(selector, criteria, limit).await)
    }

    /// Like [`search`](Self::search) with an already-parsed selector.
    pub async fn search_selected(
        &self,
        selector: SourceSelector,
        criteria: &Criteria,
        limit: i64,
    ) -> Vec<UnifiedRecord> {
        if limit <= 0 {
            return Vec::new();
        }

        let fetched = self.fetch(selector).await;
        let records: Vec<UnifiedRecord> = fetched
            .iter()
            .flat_map(|(kind, raws)| normalize_all(*kind, raws, &self.extractor))
            .collect();
        let candidates = records.len();

        let mut results = rank(self.scorer.filter(records, criteria));
        tracing::debug!(candidates, matched = results.len(), limit, "search complete");

        results.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        results
    }

    /// Distinct known authors, ascending.
    pub async fn authors(&self) -> Vec<String> {
        let authors: BTreeSet<String> = self
            .everything()
            .await
            .into_iter()
            .map(|r| r.author)
            .filter(|a| !a.is_empty() && a != UNKNOWN_AUTHOR)
            .collect();
        authors.into_iter().collect()
    }

    /// Distinct years, newest first.
    pub async fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self
            .everything()
            .await
            .into_iter()
            .filter_map(|r| r.year)
            .collect();
        years.into_iter().rev().collect()
    }

    /// Counts by source, year, author and type.
    pub async fn stats(&self) -> ReferenceStats {
        ReferenceStats::from_records(&self.everything().await)
    }

    async fn everything(&self) -> Vec<UnifiedRecord> {
        self.search_selected(SourceSelector::All, &Criteria::new(), self.stats_limit)
            .await
    }

    /// Fetch raw listings from every selected collector concurrently.
    async fn fetch(&self, selector: SourceSelector) -> Vec<(SourceKind, Vec<RawRecord>)> {
        let selected: Vec<&dyn Collector> = self
            .registry
            .collectors()
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| selector.includes(c.kind()))
            .collect();

        futures::future::join_all(
            selected
                .into_iter()
                .map(|c| async move { (c.kind(), cached_or_refreshed(c).await) }),
        )
        .await
    }
}

/// Run a search and print the results, as `refs search` does.
pub async fn run_search(
    engine: &SearchEngine,
    sources: &str,
    criteria: &Criteria,
    limit: i64,
) -> anyhow::Result<()> {
    let results = engine.search(sources, criteria, limit).await?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{} result{}", results.len(), if results.len() == 1 { "" } else { "s" });
    println!();
    for (i, r) in results.iter().enumerate() {
        let year = r.year.map(|y| y.to_string()).unwrap_or_else(|| "n.d.".to_string());
        println!("{}. [{}] {} ({}) / {}", i + 1, r.score, r.author, year, r.title);
        println!("    source: {}", r.source);
        println!("    type: {}  size: {}", r.kind, format_bytes(r.size));
        if !r.modified.is_empty() {
            println!("    modified: {}", r.modified);
        }
        if !r.path.is_empty() {
            println!("    path: {}", r.path);
        }
        println!();
    }
    Ok(())
}

/// The collector's cached listing, refreshing once if it is empty.
async fn cached_or_refreshed(collector: &dyn Collector) -> Vec<RawRecord> {
    let kind = collector.kind();
    let cached = collector.cached_files();
    if !cached.is_empty() {
        return cached;
    }

    match collector.refresh().await {
        Ok(count) => {
            tracing::info!(source = %kind, count, "refreshed empty cache");
            collector.cached_files()
        }
        Err(e) => {
            let error = format!("{:#}", e);
            tracing::warn!(source = %kind, %error, "refresh failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory collector whose cache starts empty until refreshed.
    struct Fake {
        kind: SourceKind,
        backing: Vec<RawRecord>,
        cache: Mutex<Vec<RawRecord>>,
        refreshes: AtomicUsize,
        fail: bool,
    }

    impl Fake {
        fn cached(kind: SourceKind, names: &[&str]) -> Self {
            let records: Vec<_> = names.iter().map(|n| RawRecord::new().with("name", *n)).collect();
            Self {
                kind,
                backing: records.clone(),
                cache: Mutex::new(records),
                refreshes: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn uncached(kind: SourceKind, names: &[&str]) -> Self {
            let fake = Self::cached(kind, names);
            fake.cache.lock().unwrap().clear();
            fake
        }

        fn failing(kind: SourceKind) -> Self {
            Self {
                fail: true,
                ..Self::uncached(kind, &[])
            }
        }
    }

    #[async_trait]
    impl Collector for Fake {
        fn kind(&self) -> SourceKind {
            self.kind
        }
        fn description(&self) -> &str {
            "fake"
        }
        fn cached_files(&self) -> Vec<RawRecord> {
            self.cache.lock().unwrap().clone()
        }
        async fn refresh(&self) -> anyhow::Result<usize> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("backend down");
            }
            *self.cache.lock().unwrap() = self.backing.clone();
            Ok(self.backing.len())
        }
        fn last_refresh(&self) -> Option<DateTime<Utc>> {
            None
        }
    }

    fn engine(collectors: Vec<Fake>) -> SearchEngine {
        let mut registry = CollectorRegistry::new();
        for c in collectors {
            registry.register(Box::new(c));
        }
        SearchEngine::new(registry, Supervisor::default(), 1000)
    }

    #[tokio::test]
    async fn zero_or_negative_limit_is_empty() {
        let e = engine(vec![Fake::cached(SourceKind::Local, &["Smith_2020_X.pdf"])]);
        assert!(e.search("all", &Criteria::new(), 0).await.unwrap().is_empty());
        assert!(e.search("all", &Criteria::new(), -3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_source_is_an_input_error() {
        let e = engine(vec![]);
        assert!(e.search("dropbox", &Criteria::new(), 10).await.is_err());
    }

    #[tokio::test]
    async fn empty_cache_triggers_one_refresh() {
        let e = engine(vec![Fake::uncached(SourceKind::CloudStore, &["Doe_2019_A.pdf"])]);
        let results = e.search("drive", &Criteria::new(), 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, SourceKind::CloudStore);
    }

    #[tokio::test]
    async fn selector_limits_sources() {
        let e = engine(vec![
            Fake::cached(SourceKind::Local, &["Local_2001_A.pdf"]),
            Fake::cached(SourceKind::VersionControl, &["Git_2002_B.pdf"]),
        ]);
        let results = e.search("github", &Criteria::new(), 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].author, "Git");

        // Selecting a source with no collector is not an error.
        assert!(e.search("drive", &Criteria::new(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_refresh_drops_only_that_source() {
        let e = engine(vec![
            Fake::failing(SourceKind::CloudStore),
            Fake::cached(SourceKind::Local, &["Smith_2020_A.pdf", "Jones_2018_B.pdf"]),
        ]);
        let results = e.search("all", &Criteria::new(), 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].author, "Smith");
        assert!(results.iter().all(|r| r.source == SourceKind::Local));
    }

    #[tokio::test]
    async fn results_are_ranked_and_truncated() {
        let e = engine(vec![Fake::cached(
            SourceKind::Local,
            &["Adams_2010_A.pdf", "Brown_2015_B.pdf", "Clark_2020_C.pdf"],
        )]);
        let results = e.search("all", &Criteria::new(), 2).await.unwrap();
        let years: Vec<_> = results.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![Some(2020), Some(2015)]);
        assert!(results.iter().all(|r| r.score == 3));
    }

    #[tokio::test]
    async fn aggregates_cover_all_sources() {
        let e = engine(vec![
            Fake::cached(SourceKind::Local, &["Smith_2020_A.pdf", "0042.pdf"]),
            Fake::cached(SourceKind::VersionControl, &["Jones_2018_B.djvu"]),
        ]);
        assert_eq!(e.authors().await, vec!["Jones".to_string(), "Smith".to_string()]);
        assert_eq!(e.years().await, vec![2020, 2018]);

        let stats = e.stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_year.get(UNKNOWN_YEAR), Some(&1));
        assert_eq!(stats.by_type.get("djvu"), Some(&1));
        assert_eq!(stats.by_source.get("Local"), Some(&2));
    }
}
