//! Local filesystem collector.
//!
//! Walks the configured root with `walkdir`, keeps files matching the
//! include globs (minus the excludes), and caches one record per file.
//! The walk and the cache write run on tokio's blocking pool so a large
//! tree does not stall the network collectors polled alongside it.
//! Also knows how to file a new reference into the root under a name the
//! filename heuristics can read back.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache::ListingCache;
use crate::config::LocalSourceConfig;
use crate::models::{RawRecord, SourceKind};
use crate::normalize::local_keys;
use crate::traits::Collector;

pub struct LocalCollector {
    config: LocalSourceConfig,
    cache: ListingCache,
}

impl LocalCollector {
    /// Fails if the root directory does not exist.
    pub fn new(config: LocalSourceConfig, cache_dir: &Path) -> Result<Self> {
        if !config.root.is_dir() {
            bail!(
                "Local references root does not exist: {}",
                config.root.display()
            );
        }
        Ok(Self {
            config,
            cache: ListingCache::new(cache_dir, SourceKind::Local.key()),
        })
    }

    /// Copy `file` into the root as `Author_Year_Title.ext`.
    ///
    /// Parts that are not given are left out; with none given the original
    /// filename is kept. Returns the destination path.
    pub fn add_reference(
        &self,
        file: &Path,
        title: Option<&str>,
        author: Option<&str>,
        year: Option<i32>,
    ) -> Result<PathBuf> {
        if !file.is_file() {
            bail!("Not a file: {}", file.display());
        }
        let original = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("File has no name: {}", file.display()))?;

        let file_name = reference_file_name(&original, title, author, year);
        let dest = self.config.root.join(&file_name);
        if file_name.is_empty() || dest.parent() != Some(self.config.root.as_path()) {
            bail!("Refusing to add '{}' outside {}", file_name, self.config.root.display());
        }
        if dest.exists() {
            bail!("A reference named '{}' already exists", file_name);
        }

        std::fs::copy(file, &dest)
            .with_context(|| format!("Failed to copy {} to {}", file.display(), dest.display()))?;
        tracing::info!(dest = %dest.display(), "reference added");
        Ok(dest)
    }
}

#[async_trait]
impl Collector for LocalCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn description(&self) -> &str {
        "Reference files under a local directory"
    }

    fn cached_files(&self) -> Vec<RawRecord> {
        self.cache.records()
    }

    async fn refresh(&self) -> Result<usize> {
        let config = self.config.clone();
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || cache.store(scan_local(&config)?))
            .await
            .context("Local scan task failed")?
    }

    fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.cache.refreshed_at()
    }
}

/// Walk the local root and produce one raw record per matching file.
pub fn scan_local(config: &LocalSourceConfig) -> Result<Vec<RawRecord>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Local references root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        entries.push((rel_str, file_to_record(path, relative)?));
    }

    // Sort for deterministic ordering
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!(root = %root.display(), count = entries.len(), "local scan complete");

    Ok(entries.into_iter().map(|(_, record)| record).collect())
}

fn file_to_record(path: &Path, relative: &Path) -> Result<RawRecord> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let modified = metadata
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
        .unwrap_or_default();

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    Ok(RawRecord::new()
        .with(local_keys::ID, short_hash(&relative.to_string_lossy()))
        .with(local_keys::NAME, name)
        .with(local_keys::PATH, path.to_string_lossy().to_string())
        .with(local_keys::SIZE, metadata.len())
        .with(local_keys::MODIFIED, modified)
        .with(local_keys::EXTENSION, extension))
}

/// `Author_Year_Title.ext`, with spaces turned into underscores.
///
/// Every part is reduced to a single path component, so the result never
/// leaves the directory it is joined onto.
fn reference_file_name(
    original: &str,
    title: Option<&str>,
    author: Option<&str>,
    year: Option<i32>,
) -> String {
    let original_path = Path::new(original);
    let stem = original_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| original.to_string());

    let mut parts: Vec<String> = Vec::new();
    if let Some(author) = author.map(file_name_part).filter(|a| !a.is_empty()) {
        parts.push(author.replace(',', "").split_whitespace().collect::<Vec<_>>().join("-"));
    }
    if let Some(year) = year {
        parts.push(year.to_string());
    }
    let title = title
        .map(file_name_part)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| file_name_part(&stem));
    if !title.is_empty() {
        parts.push(title.split_whitespace().collect::<Vec<_>>().join("_"));
    }

    let base = parts.join("_");
    match original_path.extension().map(|e| file_name_part(&e.to_string_lossy())) {
        Some(ext) if !ext.is_empty() && !base.is_empty() => format!("{}.{}", base, ext),
        _ => base,
    }
}

/// Replace path separators and characters filesystems reject, then trim
/// dots and whitespace so `.` and `..` cannot survive.
fn file_name_part(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    cleaned
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())[..12].to_string()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
