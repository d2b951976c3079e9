//! Google Drive collector.
//!
//! Pages through the Drive v3 `files.list` endpoint for the configured
//! folder (`'<folder>' in parents and trashed = false`), following
//! `nextPageToken` and descending into sub-folders.
//!
//! # Configuration
//!
//! ```toml
//! [sources.drive]
//! folder_id = "1AbCdEf..."
//! # token_env = "GOOGLE_DRIVE_TOKEN"
//! ```
//!
//! # Environment Variables
//!
//! - `GOOGLE_DRIVE_TOKEN` (or whatever `token_env` names): an OAuth
//!   access token with `drive.readonly` scope. Required: without it the
//!   collector is unavailable.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cache::ListingCache;
use crate::config::DriveSourceConfig;
use crate::models::{RawRecord, SourceKind};
use crate::normalize::drive_keys;
use crate::traits::Collector;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, webViewLink, size, modifiedTime)";
const PAGE_SIZE: &str = "1000";

pub struct DriveCollector {
    config: DriveSourceConfig,
    token: String,
    client: reqwest::Client,
    cache: ListingCache,
}

impl DriveCollector {
    /// Fails if the folder id is blank or the token variable is unset.
    pub fn new(config: DriveSourceConfig, cache_dir: &Path) -> Result<Self> {
        if config.folder_id.trim().is_empty() {
            bail!("Google Drive folder_id is empty");
        }
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("Google Drive token not set (env var {})", config.token_env)
            })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            config,
            token,
            client,
            cache: ListingCache::new(cache_dir, SourceKind::CloudStore.key()),
        })
    }
}

#[async_trait]
impl Collector for DriveCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::CloudStore
    }

    fn description(&self) -> &str {
        "Reference files in a Google Drive folder"
    }

    fn cached_files(&self) -> Vec<RawRecord> {
        self.cache.records()
    }

    async fn refresh(&self) -> Result<usize> {
        let records = scan_drive(&self.client, &self.config, &self.token).await?;
        self.cache.store(records)
    }

    fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.cache.refreshed_at()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    web_view_link: Option<String>,
    /// Drive reports sizes as decimal strings; folders have none.
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
}

/// List every non-folder file under the configured folder, recursively.
pub async fn scan_drive(
    client: &reqwest::Client,
    config: &DriveSourceConfig,
    token: &str,
) -> Result<Vec<RawRecord>> {
    let mut pending = vec![config.folder_id.clone()];
    let mut files = Vec::new();

    while let Some(folder) = pending.pop() {
        let mut page_token: Option<String> = None;
        loop {
            let page = list_page(client, config, token, &folder, page_token.as_deref()).await?;
            for file in page.files {
                if file.mime_type == FOLDER_MIME_TYPE {
                    pending.push(file.id);
                } else {
                    files.push(file);
                }
            }
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    tracing::debug!(folder = %config.folder_id, count = files.len(), "drive listing complete");
    Ok(files.into_iter().map(file_to_record).collect())
}

async fn list_page(
    client: &reqwest::Client,
    config: &DriveSourceConfig,
    token: &str,
    folder: &str,
    page_token: Option<&str>,
) -> Result<FileList> {
    let url = format!("{}/files", config.api_base.trim_end_matches('/'));
    let query = folder_query(folder);
    let mut params = vec![
        ("q", query.as_str()),
        ("fields", LIST_FIELDS),
        ("pageSize", PAGE_SIZE),
    ];
    if let Some(t) = page_token {
        params.push(("pageToken", t));
    }

    let response = client
        .get(&url)
        .query(&params)
        .bearer_auth(token)
        .send()
        .await
        .with_context(|| format!("Google Drive request failed: {}", url))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Google Drive API error ({}): {}", status, body.trim());
    }

    response
        .json::<FileList>()
        .await
        .context("Unexpected Google Drive response")
}

fn folder_query(folder: &str) -> String {
    format!(
        "'{}' in parents and trashed = false",
        folder.replace('\\', "\\\\").replace('\'', "\\'")
    )
}

fn file_to_record(file: DriveFile) -> RawRecord {
    RawRecord::new()
        .with(drive_keys::ID, file.id)
        .with(drive_keys::NAME, file.name)
        .with(drive_keys::LINK, file.web_view_link.unwrap_or_default())
        .with(drive_keys::SIZE, file.size.unwrap_or_default())
        .with(drive_keys::MODIFIED, file.modified_time.unwrap_or_default())
        .with(drive_keys::MIME_TYPE, file.mime_type)
}
