//! TOML configuration parsing and validation.
//!
//! Every section is optional except that at least one source must be
//! configured for searches to return anything. Credentials never live in
//! the file: sources name the environment variable that holds them.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::metadata::Supervisor;

/// Top-level configuration, one field per TOML section.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// `[cache]`: where collectors keep their listings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// `[search]`: result limits.
    #[serde(default)]
    pub search: SearchConfig,
    /// `[supervisor]`: the author who gets a canonical name and a bonus.
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    /// `[sources.*]`: the backends to search.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Listing cache settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Directory holding one `<source>.json` file per collector. Created
    /// on first refresh. Defaults to `data/cache`.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

/// Search limits.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Results returned by `refs search` when `--limit` is not given.
    /// Must be at least 1. Defaults to 10.
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    /// Limit used by the author/year/stats aggregate queries.
    #[serde(default = "default_stats_limit")]
    pub stats_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            stats_limit: default_stats_limit(),
        }
    }
}

fn default_limit() -> i64 {
    10
}
fn default_stats_limit() -> i64 {
    1000
}

/// Supervisor override applied during metadata extraction and scoring.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SupervisorConfig {
    /// Case-insensitive substring looked for in filenames. Must not be blank.
    #[serde(default = "default_supervisor_needle")]
    pub needle: String,
    /// Author name given to every file that mentions the needle.
    #[serde(default = "default_supervisor_canonical")]
    pub canonical: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            needle: default_supervisor_needle(),
            canonical: default_supervisor_canonical(),
        }
    }
}

fn default_supervisor_needle() -> String {
    "mayrand".to_string()
}
fn default_supervisor_canonical() -> String {
    "Mayrand, Maxence".to_string()
}

impl SupervisorConfig {
    pub fn to_supervisor(&self) -> Supervisor {
        Supervisor::new(&self.needle, &self.canonical)
    }
}

/// Backend sections. A missing section means that backend is not searched.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SourcesConfig {
    /// `[sources.drive]`: a Google Drive folder.
    pub drive: Option<DriveSourceConfig>,
    /// `[sources.github]`: a directory of a GitHub repository.
    pub github: Option<GithubSourceConfig>,
    /// `[sources.local]`: a directory on this machine.
    pub local: Option<LocalSourceConfig>,
}

/// Google Drive source.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DriveSourceConfig {
    /// ID of the folder to list (the last segment of its Drive URL).
    /// Sub-folders are listed too.
    pub folder_id: String,
    /// Environment variable holding an OAuth access token. Required at
    /// startup; without it the source is reported unavailable.
    #[serde(default = "default_drive_token_env")]
    pub token_env: String,
    /// Drive v3 API root.
    #[serde(default = "default_drive_api_base")]
    pub api_base: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_drive_token_env() -> String {
    "GOOGLE_DRIVE_TOKEN".to_string()
}
fn default_drive_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// GitHub repository source.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GithubSourceConfig {
    /// Repository in `owner/name` form.
    pub repo: String,
    /// Branch, tag or commit to list. Defaults to `main`.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Subdirectory to list; empty means the repository root.
    #[serde(default)]
    pub path: String,
    /// Environment variable holding a token. Optional for public repos.
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    /// REST API root (change for GitHub Enterprise).
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    /// Repository paths to keep. Defaults to common reference formats.
    #[serde(default = "default_reference_globs")]
    pub include_globs: Vec<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_branch() -> String {
    "main".to_string()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

/// Local directory source.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LocalSourceConfig {
    /// Directory to scan recursively. Must exist. `refs add` copies into it.
    pub root: PathBuf,
    /// Globs, relative to `root`, of files to keep. Defaults to common
    /// reference formats.
    #[serde(default = "default_reference_globs")]
    pub include_globs: Vec<String>,
    /// Globs to skip, on top of `.git`, `target` and `node_modules`.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Follow symbolic links while walking.
    #[serde(default)]
    pub follow_symlinks: bool,
}

/// `**/*.<ext>` for PDF, DjVu, EPUB, PostScript, BibTeX and TeX files.
pub fn default_reference_globs() -> Vec<String> {
    ["pdf", "djvu", "epub", "ps", "bib", "tex"]
        .iter()
        .map(|ext| format!("**/*.{}", ext))
        .collect()
}

/// Read and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.search.default_limit < 1 {
        bail!("search.default_limit must be >= 1");
    }
    if config.search.stats_limit < 1 {
        bail!("search.stats_limit must be >= 1");
    }
    if config.supervisor.needle.trim().is_empty() {
        bail!("supervisor.needle must not be empty");
    }

    if let Some(github) = &config.sources.github {
        let valid = github
            .repo
            .split_once('/')
            .map(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
            .unwrap_or(false);
        if !valid {
            bail!(
                "sources.github.repo must be 'owner/name', got '{}'",
                github.repo
            );
        }
        if github.include_globs.is_empty() {
            bail!("sources.github.include_globs must not be empty");
        }
    }

    if let Some(local) = &config.sources.local {
        if local.include_globs.is_empty() {
            bail!("sources.local.include_globs must not be empty");
        }
    }

    Ok(config)
}
