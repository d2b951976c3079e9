//! On-disk listing cache shared by the collectors.
//!
//! Each source keeps one JSON file, `<cache.dir>/<source>.json`, holding
//! the records of its last refresh and when that refresh happened.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::RawRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub refreshed_at: DateTime<Utc>,
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Clone)]
pub struct ListingCache {
    path: PathBuf,
}

impl ListingCache {
    pub fn new(dir: &Path, source_key: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", source_key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last snapshot. `Ok(None)` if nothing has been cached yet.
    pub fn load(&self) -> Result<Option<CacheSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache file: {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt cache file: {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Cached records, treating an unreadable cache as empty.
    pub fn records(&self) -> Vec<RawRecord> {
        match self.load() {
            Ok(Some(snapshot)) => snapshot.records,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable listing cache");
                Vec::new()
            }
        }
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.load().ok().flatten().map(|s| s.refreshed_at)
    }

    /// Replace the cached listing. Writes to a sibling temp file first so
    /// readers never see a half-written snapshot.
    pub fn store(&self, records: Vec<RawRecord>) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }
        let count = records.len();
        let snapshot = CacheSnapshot {
            refreshed_at: Utc::now(),
            records,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace cache file: {}", self.path.display()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_cache_is_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = ListingCache::new(tmp.path(), "local");
        assert!(cache.load().unwrap().is_none());
        assert!(cache.records().is_empty());
        assert!(cache.refreshed_at().is_none());
    }

    #[test]
    fn store_then_load() {
        let tmp = TempDir::new().unwrap();
        let cache = ListingCache::new(&tmp.path().join("nested"), "drive");
        let stored = cache
            .store(vec![RawRecord::new().with("name", "Smith_2020_X.pdf")])
            .unwrap();
        assert_eq!(stored, 1);

        let records = cache.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].str_field("name"), Some("Smith_2020_X.pdf"));
        assert!(cache.refreshed_at().is_some());
        assert!(cache.path().ends_with("drive.json"));
    }

    #[test]
    fn corrupt_cache_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = ListingCache::new(tmp.path(), "github");
        std::fs::write(cache.path(), "{not json").unwrap();
        assert!(cache.load().is_err());
        assert!(cache.records().is_empty());
    }
}
