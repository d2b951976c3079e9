//! Core data models used throughout refharness.
//!
//! [`RawRecord`] is what a collector caches; [`UnifiedRecord`] is what the
//! search pipeline builds from it, fresh on every call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// Author sentinel used when nothing better could be inferred.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Type sentinel used when a record carries no file extension.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Provenance of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    /// Google Drive folder.
    CloudStore,
    /// GitHub repository.
    VersionControl,
    /// Local directory tree.
    Local,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::CloudStore,
        SourceKind::VersionControl,
        SourceKind::Local,
    ];

    /// Short name used on the command line and for cache files.
    pub fn key(self) -> &'static str {
        match self {
            SourceKind::CloudStore => "drive",
            SourceKind::VersionControl => "github",
            SourceKind::Local => "local",
        }
    }

    /// Human-readable label used in results and statistics.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::CloudStore => "Google Drive",
            SourceKind::VersionControl => "GitHub",
            SourceKind::Local => "Local",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which collectors a search should read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelector {
    All,
    Only(SourceKind),
}

impl SourceSelector {
    pub fn includes(self, kind: SourceKind) -> bool {
        match self {
            SourceSelector::All => true,
            SourceSelector::Only(k) => k == kind,
        }
    }
}

impl FromStr for SourceSelector {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(SourceSelector::All),
            "drive" | "cloud" => Ok(SourceSelector::Only(SourceKind::CloudStore)),
            "github" | "git" => Ok(SourceSelector::Only(SourceKind::VersionControl)),
            "local" | "filesystem" => Ok(SourceSelector::Only(SourceKind::Local)),
            _ => Err(SearchError::UnknownSource(s.to_string())),
        }
    }
}

/// A backend-specific listing entry, as cached by a collector.
///
/// Keys differ per backend; the normalizer knows which ones to read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// A reference normalized across all backends.
///
/// Built fresh for each search; `score` only means something within the
/// call that computed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub source: SourceKind,
    pub path: String,
    pub size: u64,
    pub modified: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub score: i64,
}

impl UnifiedRecord {
    /// String forms of every populated field, used for weak keyword matches.
    ///
    /// Empty strings, a zero size, and a missing year are skipped.
    pub fn field_strings(&self) -> Vec<String> {
        let mut fields = vec![
            self.id.clone(),
            self.title.clone(),
            self.author.clone(),
            self.source.label().to_string(),
            self.path.clone(),
            self.modified.clone(),
            self.kind.clone(),
        ];
        if let Some(year) = self.year {
            fields.push(year.to_string());
        }
        if self.size > 0 {
            fields.push(self.size.to_string());
        }
        fields.retain(|f| !f.is_empty());
        fields
    }
}

/// Query criteria for a search. Absent fields impose no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub keyword: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = non_blank(keyword.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = non_blank(author.into());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Build criteria from loosely-typed input (e.g. command-line strings).
    ///
    /// Blank strings count as absent. A year that is not an integer is an
    /// input error rather than a silently ignored filter.
    pub fn from_input(
        keyword: Option<&str>,
        author: Option<&str>,
        year: Option<&str>,
    ) -> Result<Self, SearchError> {
        let year = match year.map(str::trim).filter(|y| !y.is_empty()) {
            Some(y) => Some(y.parse::<i32>().map_err(|_| {
                SearchError::InvalidQuery(format!("year '{}' is not a number", y))
            })?),
            None => None,
        };
        Ok(Self {
            keyword: keyword.and_then(|k| non_blank(k.to_string())),
            author: author.and_then(|a| non_blank(a.to_string())),
            year,
        })
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
