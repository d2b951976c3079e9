//! Mapping from backend-specific listing records to [`UnifiedRecord`].
//!
//! Each backend caches different keys; [`normalize`] dispatches on the
//! record's [`SourceKind`]. A record that cannot be mapped is logged and
//! skipped, never fatal to the batch.

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

use crate::metadata::{clean_title, extension_of, MetadataExtractor};
use crate::models::{RawRecord, SourceKind, UnifiedRecord, UNKNOWN_TYPE};

/// Raw keys written by the Google Drive collector.
pub mod drive_keys {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const LINK: &str = "link";
    pub const SIZE: &str = "size";
    pub const MODIFIED: &str = "modified";
    pub const MIME_TYPE: &str = "mime_type";
}

/// Raw keys written by the GitHub collector.
pub mod github_keys {
    pub const SHA: &str = "sha";
    pub const NAME: &str = "name";
    pub const HTML_URL: &str = "html_url";
    pub const SIZE: &str = "size";
    pub const PATH: &str = "path";
}

/// Raw keys written by the local filesystem collector.
pub mod local_keys {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const PATH: &str = "path";
    pub const SIZE: &str = "size";
    pub const MODIFIED: &str = "modified";
    pub const EXTENSION: &str = "extension";
}

/// Normalize one raw record, or `None` if it cannot be converted.
pub fn normalize(
    kind: SourceKind,
    raw: &RawRecord,
    extractor: &MetadataExtractor,
) -> Option<UnifiedRecord> {
    let converted = match kind {
        SourceKind::CloudStore => convert_drive(raw, extractor),
        SourceKind::VersionControl => convert_github(raw, extractor),
        SourceKind::Local => convert_local(raw, extractor),
    };
    match converted {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(source = %kind, error = %e, "skipping unconvertible record");
            None
        }
    }
}

/// Normalize a batch, dropping records that fail conversion.
pub fn normalize_all(
    kind: SourceKind,
    raws: &[RawRecord],
    extractor: &MetadataExtractor,
) -> Vec<UnifiedRecord> {
    raws.iter()
        .filter_map(|raw| normalize(kind, raw, extractor))
        .collect()
}

fn convert_drive(raw: &RawRecord, extractor: &MetadataExtractor) -> Result<UnifiedRecord> {
    use drive_keys::*;

    let name = required_name(raw, NAME)?;
    let kind = match extension_of(name) {
        Some(ext) => ext,
        None if raw.str_field(MIME_TYPE) == Some("application/pdf") => "pdf".to_string(),
        None => UNKNOWN_TYPE.to_string(),
    };
    Ok(build(
        extractor,
        name,
        SourceKind::CloudStore,
        text(raw, ID),
        text(raw, LINK),
        size(raw, SIZE)?,
        text(raw, MODIFIED),
        kind,
    ))
}

fn convert_github(raw: &RawRecord, extractor: &MetadataExtractor) -> Result<UnifiedRecord> {
    use github_keys::*;

    let name = required_name(raw, NAME)?;
    // The contents API reports no modification time.
    Ok(build(
        extractor,
        name,
        SourceKind::VersionControl,
        text(raw, SHA),
        text(raw, HTML_URL),
        size(raw, SIZE)?,
        String::new(),
        extension_of(name).unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
    ))
}

fn convert_local(raw: &RawRecord, extractor: &MetadataExtractor) -> Result<UnifiedRecord> {
    use local_keys::*;

    let name = required_name(raw, NAME)?;
    let kind = raw
        .str_field(EXTENSION)
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
    Ok(build(
        extractor,
        name,
        SourceKind::Local,
        text(raw, ID),
        text(raw, PATH),
        size(raw, SIZE)?,
        text(raw, MODIFIED),
        kind,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build(
    extractor: &MetadataExtractor,
    name: &str,
    source: SourceKind,
    id: String,
    path: String,
    size: u64,
    modified: String,
    kind: String,
) -> UnifiedRecord {
    let meta = extractor.extract(name);
    UnifiedRecord {
        id,
        title: clean_title(name),
        author: meta.author,
        year: meta.year,
        source,
        path,
        size,
        modified,
        kind,
        score: 0,
    }
}

fn required_name<'a>(raw: &'a RawRecord, key: &str) -> Result<&'a str> {
    match raw.str_field(key).map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => bail!("record has no '{}'", key),
    }
}

fn text(raw: &RawRecord, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Sizes arrive as JSON numbers (GitHub, local) or numeric strings (Drive).
fn size(raw: &RawRecord, key: &str) -> Result<u64> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| anyhow!("'{}' is not a non-negative integer: {}", key, n)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow!("'{}' is not a non-negative integer: {:?}", key, s)),
        Some(other) => bail!("'{}' has unexpected type: {}", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::default()
    }

    #[test]
    fn drive_record_maps_fields() {
        let raw = RawRecord::new()
            .with("id", "1AbC")
            .with("name", "Smith_2020_Paper_on_X.pdf")
            .with("link", "https://drive.google.com/file/d/1AbC/view")
            .with("size", "2048")
            .with("modified", "2023-04-01T10:00:00Z");
        let record = normalize(SourceKind::CloudStore, &raw, &extractor()).unwrap();

        assert_eq!(record.id, "1AbC");
        assert_eq!(record.title, "Smith Paper on X");
        assert_eq!(record.author, "Smith");
        assert_eq!(record.year, Some(2020));
        assert_eq!(record.source, SourceKind::CloudStore);
        assert_eq!(record.path, "https://drive.google.com/file/d/1AbC/view");
        assert_eq!(record.size, 2048);
        assert_eq!(record.modified, "2023-04-01T10:00:00Z");
        assert_eq!(record.kind, "pdf");
        assert_eq!(record.score, 0);
    }

    #[test]
    fn drive_type_falls_back_to_mime_type() {
        let raw = RawRecord::new()
            .with("name", "Scanned chapter")
            .with("mime_type", "application/pdf");
        let record = normalize(SourceKind::CloudStore, &raw, &extractor()).unwrap();
        assert_eq!(record.kind, "pdf");

        let raw = RawRecord::new().with("name", "Scanned chapter");
        let record = normalize(SourceKind::CloudStore, &raw, &extractor()).unwrap();
        assert_eq!(record.kind, UNKNOWN_TYPE);
    }

    #[test]
    fn github_record_has_empty_modified_and_derived_type() {
        let raw = RawRecord::new()
            .with("sha", "abc123")
            .with("name", "Doe_2018_Surfaces.DJVU")
            .with("html_url", "https://github.com/o/r/blob/main/Doe_2018_Surfaces.DJVU")
            .with("size", 99);
        let record = normalize(SourceKind::VersionControl, &raw, &extractor()).unwrap();

        assert_eq!(record.id, "abc123");
        assert_eq!(record.modified, "");
        assert_eq!(record.kind, "djvu");
        assert_eq!(record.size, 99);
        assert_eq!(record.author, "Doe");
    }

    #[test]
    fn local_record_strips_extension_dot() {
        let raw = RawRecord::new()
            .with("id", "a1b2c3")
            .with("name", "notes.TeX")
            .with("path", "/refs/notes.TeX")
            .with("size", 10)
            .with("modified", "2024-01-01T00:00:00+00:00")
            .with("extension", ".TeX");
        let record = normalize(SourceKind::Local, &raw, &extractor()).unwrap();
        assert_eq!(record.kind, "tex");
        assert_eq!(record.path, "/refs/notes.TeX");

        let raw = RawRecord::new().with("name", "README");
        let record = normalize(SourceKind::Local, &raw, &extractor()).unwrap();
        assert_eq!(record.kind, UNKNOWN_TYPE);
        assert_eq!(record.size, 0);
    }

    #[test]
    fn missing_name_is_a_conversion_failure() {
        let raw = RawRecord::new().with("id", "x").with("name", "  ");
        assert!(normalize(SourceKind::Local, &raw, &extractor()).is_none());
        assert!(normalize(SourceKind::CloudStore, &RawRecord::new(), &extractor()).is_none());
    }

    #[test]
    fn bad_size_is_a_conversion_failure() {
        let raw = RawRecord::new().with("name", "a.pdf").with("size", -5);
        assert!(normalize(SourceKind::VersionControl, &raw, &extractor()).is_none());

        let raw = RawRecord::new().with("name", "a.pdf").with("size", "lots");
        assert!(normalize(SourceKind::CloudStore, &raw, &extractor()).is_none());
    }

    #[test]
    fn batch_skips_bad_records_and_keeps_the_rest() {
        let raws = vec![
            RawRecord::new().with("name", "Good_2001_One.pdf"),
            RawRecord::new().with("size", 3),
            RawRecord::new().with("name", "Good_2002_Two.pdf"),
        ];
        let records = normalize_all(SourceKind::Local, &raws, &extractor());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].year, Some(2002));
    }
}
