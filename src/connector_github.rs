//! GitHub repository collector.
//!
//! Lists reference files through the REST contents API
//! (`GET /repos/{owner}/{repo}/contents/{path}?ref={branch}`), descending
//! into sub-directories and keeping files that match the include globs.
//! Nothing is cloned.
//!
//! # Configuration
//!
//! ```toml
//! [sources.github]
//! repo = "yassine/references"
//! branch = "main"
//! path = "papers"
//! ```
//!
//! A token is optional (public repositories work without one) and read
//! from the variable named by `token_env`, `GITHUB_TOKEN` by default.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cache::ListingCache;
use crate::config::GithubSourceConfig;
use crate::models::{RawRecord, SourceKind};
use crate::normalize::github_keys;
use crate::traits::Collector;

pub struct GithubCollector {
    config: GithubSourceConfig,
    token: Option<String>,
    client: reqwest::Client,
    cache: ListingCache,
}

impl GithubCollector {
    pub fn new(config: GithubSourceConfig, cache_dir: &Path) -> Result<Self> {
        if config.repo.split('/').filter(|p| !p.is_empty()).count() != 2 {
            bail!("GitHub repo must be 'owner/name', got '{}'", config.repo);
        }
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        let client = reqwest::Client::builder()
            .user_agent(concat!("refharness/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            config,
            token,
            client,
            cache: ListingCache::new(cache_dir, SourceKind::VersionControl.key()),
        })
    }
}

#[async_trait]
impl Collector for GithubCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::VersionControl
    }

    fn description(&self) -> &str {
        "Reference files in a GitHub repository"
    }

    fn cached_files(&self) -> Vec<RawRecord> {
        self.cache.records()
    }

    async fn refresh(&self) -> Result<usize> {
        let records = scan_github(&self.client, &self.config, self.token.as_deref()).await?;
        self.cache.store(records)
    }

    fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.cache.refreshed_at()
    }
}

/// One entry of a contents API directory listing.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    html_url: Option<String>,
}

/// List every matching file in the configured repository subtree.
pub async fn scan_github(
    client: &reqwest::Client,
    config: &GithubSourceConfig,
    token: Option<&str>,
) -> Result<Vec<RawRecord>> {
    let include_set = build_globset(&config.include_globs)?;
    let mut pending = vec![config.path.trim_matches('/').to_string()];
    let mut records = Vec::new();

    while let Some(dir) = pending.pop() {
        for entry in list_directory(client, config, token, &dir).await? {
            match entry.entry_type.as_str() {
                "dir" => pending.push(entry.path),
                "file" => {
                    if include_set.is_match(&entry.path) {
                        records.push((entry.path.clone(), entry_to_record(entry)));
                    }
                }
                _ => {}
            }
        }
    }

    records.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!(repo = %config.repo, count = records.len(), "github listing complete");
    Ok(records.into_iter().map(|(_, r)| r).collect())
}

async fn list_directory(
    client: &reqwest::Client,
    config: &GithubSourceConfig,
    token: Option<&str>,
    dir: &str,
) -> Result<Vec<ContentEntry>> {
    let url = contents_url(&config.api_base, &config.repo, dir);
    let mut request = client
        .get(&url)
        .query(&[("ref", config.branch.as_str())])
        .header("Accept", "application/vnd.github+json");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("GitHub request failed: {}", url))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("GitHub API error ({}) for {}: {}", status, url, body.trim());
    }

    let entries: Vec<ContentEntry> = response
        .json()
        .await
        .with_context(|| format!("Unexpected GitHub response for {}", url))?;
    Ok(entries)
}

fn contents_url(api_base: &str, repo: &str, dir: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if dir.is_empty() {
        format!("{}/repos/{}/contents", base, repo)
    } else {
        format!("{}/repos/{}/contents/{}", base, repo, dir)
    }
}

fn entry_to_record(entry: ContentEntry) -> RawRecord {
    RawRecord::new()
        .with(github_keys::SHA, entry.sha)
        .with(github_keys::NAME, entry.name)
        .with(github_keys::HTML_URL, entry.html_url.unwrap_or_default())
        .with(github_keys::SIZE, entry.size)
        .with(github_keys::PATH, entry.path)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
