//! Filename heuristics: author, year and title inference.
//!
//! This is a best-effort pass over filenames such as
//! `Smith_2020_Paper_on_X.pdf`, not a bibliographic parser. Author
//! inference tries, in order:
//!
//! 1. a leading name immediately followed by a year (`John-Smith_2020…`),
//! 2. the first token of the filename,
//! 3. the supervisor override, which wins over both when the filename
//!    mentions the supervisor.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::models::UNKNOWN_AUTHOR;

// A year token is a whole run of ASCII digits: exactly four, starting 19
// or 20. Extraction and title cleaning both go through `year_tokens`.
static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));
static AUTHOR_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\p{L}[\p{L}_\s-]+?)[_\s-](?:19|20)[0-9]{2}(?:[^0-9]|$)").expect("valid regex")
});
static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\-\s]+").expect("valid regex"));
static DASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\-]+").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

fn year_tokens(text: &str) -> impl Iterator<Item = regex::Match<'_>> {
    DIGIT_RUN_RE.find_iter(text).filter(|m| {
        let digits = m.as_str();
        digits.len() == 4 && (digits.starts_with("19") || digits.starts_with("20"))
    })
}

fn strip_years(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in year_tokens(text) {
        out.push_str(&text[last..m.start()]);
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// The thesis supervisor whose papers get a canonical author name and a
/// ranking bonus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supervisor {
    needle: String,
    canonical: String,
}

impl Supervisor {
    pub fn new(needle: &str, canonical: &str) -> Self {
        Self {
            needle: needle.trim().to_lowercase(),
            canonical: canonical.trim().to_string(),
        }
    }

    /// Case-insensitive containment test against the supervisor's name.
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        !self.needle.is_empty() && text.to_lowercase().contains(&self.needle)
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new("mayrand", "Mayrand, Maxence")
    }
}

/// Author and year inferred from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub author: String,
    pub year: Option<i32>,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            author: UNKNOWN_AUTHOR.to_string(),
            year: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor {
    supervisor: Supervisor,
}

impl MetadataExtractor {
    pub fn new(supervisor: Supervisor) -> Self {
        Self { supervisor }
    }

    /// Infer author and year from `filename`. Never fails: anything that
    /// cannot be inferred falls back to [`FileMetadata::default`].
    pub fn extract(&self, filename: &str) -> FileMetadata {
        match self.try_extract(filename) {
            Some(meta) => meta,
            None => {
                tracing::debug!(filename, "could not infer metadata from filename");
                FileMetadata::default()
            }
        }
    }

    fn try_extract(&self, filename: &str) -> Option<FileMetadata> {
        let name = file_stem(filename)?;

        let year = match year_tokens(&name).next() {
            Some(token) => Some(token.as_str().parse::<i32>().ok()?),
            None => None,
        };

        let mut author = match AUTHOR_YEAR_RE.captures(&name) {
            Some(caps) => {
                let raw = caps.get(1)?.as_str();
                raw.replace(['_', '-'], " ").trim().to_string()
            }
            None => first_token(&name).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        };
        if author.is_empty() {
            author = UNKNOWN_AUTHOR.to_string();
        }

        if self.supervisor.is_mentioned_in(&name) {
            author = self.supervisor.canonical().to_string();
        }

        Some(FileMetadata { author, year })
    }
}

/// First separator-delimited token without its year, if what is left looks
/// like a name (has a letter).
fn first_token(name: &str) -> Option<String> {
    SEPARATOR_RE
        .split(name)
        .find(|t| !t.is_empty())
        .map(strip_years)
        .filter(|t| t.chars().any(char::is_alphabetic))
}

fn file_stem(filename: &str) -> Option<String> {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}

/// Turn a filename into a readable title.
///
/// Drops the extension, turns `_`/`-` runs into spaces, removes the same
/// year tokens the extractor reads and collapses whitespace. Returns
/// `filename` untouched if nothing is left.
pub fn clean_title(filename: &str) -> String {
    let Some(stem) = file_stem(filename) else {
        return filename.to_string();
    };
    let title = DASHES_RE.replace_all(&stem, " ");
    let title = strip_years(&title);
    let title = WHITESPACE_RE.replace_all(&title, " ");
    let title = title.trim();
    if title.is_empty() {
        filename.to_string()
    } else {
        title.to_string()
    }
}

/// Lowercased extension of `filename` without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(name: &str) -> FileMetadata {
        MetadataExtractor::default().extract(name)
    }

    #[test]
    fn author_and_year_from_leading_pattern() {
        let meta = extract("Smith_2020_Paper_on_X.pdf");
        assert_eq!(meta.author, "Smith");
        assert_eq!(meta.year, Some(2020));
    }

    #[test]
    fn hyphenated_author_becomes_spaced() {
        let meta = extract("John-Smith_1998_Groups.pdf");
        assert_eq!(meta.author, "John Smith");
        assert_eq!(meta.year, Some(1998));
    }

    #[test]
    fn falls_back_to_first_token() {
        let meta = extract("Lectures on Hodge theory.pdf");
        assert_eq!(meta.author, "Lectures");
        assert_eq!(meta.year, None);
    }

    #[test]
    fn year_found_anywhere_but_not_inside_longer_numbers() {
        assert_eq!(extract("arxiv_2105.01234.pdf").year, None);
        assert_eq!(extract("notes_final_1987.pdf").year, Some(1987));
        assert_eq!(extract("report_120201.pdf").year, None);
    }

    #[test]
    fn unrecognizable_name_yields_unknown() {
        let meta = extract("0042-001.pdf");
        assert_eq!(meta.author, UNKNOWN_AUTHOR);
        assert_eq!(meta.year, None);
        assert_eq!(clean_title("0042-001.pdf"), "0042 001");
    }

    #[test]
    fn supervisor_override_wins_in_any_case() {
        let meta = extract("MAYRAND_notes.pdf");
        assert_eq!(meta.author, "Mayrand, Maxence");

        let meta = extract("Smith_2019_with_mayrand.pdf");
        assert_eq!(meta.author, "Mayrand, Maxence");
        assert_eq!(meta.year, Some(2019));
    }

    #[test]
    fn custom_supervisor() {
        let extractor = MetadataExtractor::new(Supervisor::new("Noether", "Noether, Emmy"));
        assert_eq!(extractor.extract("noether_rings.pdf").author, "Noether, Emmy");
        assert_eq!(extractor.extract("Mayrand_2021_notes.pdf").author, "Mayrand");
    }

    #[test]
    fn empty_supervisor_never_matches() {
        let supervisor = Supervisor::new("  ", "Nobody");
        assert!(!supervisor.is_mentioned_in("anything"));
    }

    #[test]
    fn title_drops_year_and_separators() {
        let title = clean_title("Smith_2020_Paper_on_X.pdf");
        assert_eq!(title, "Smith Paper on X");
        assert!(!title.contains("2020"));
    }

    #[test]
    fn glued_year_is_read_and_stripped_everywhere() {
        let meta = extract("Smith2020.pdf");
        assert_eq!(meta.author, "Smith");
        assert_eq!(meta.year, Some(2020));
        assert_eq!(clean_title("Smith2020.pdf"), "Smith");
    }

    #[test]
    fn suffixed_year_is_read_and_stripped() {
        let meta = extract("Hodge_2020a_notes.pdf");
        assert_eq!(meta.author, "Hodge");
        assert_eq!(meta.year, Some(2020));
        assert_eq!(clean_title("Hodge_2020a_notes.pdf"), "Hodge a notes");

        assert_eq!(extract("Serre_1973b_Cours.pdf").year, Some(1973));
        assert_eq!(clean_title("Serre_1973b_Cours.pdf"), "Serre b Cours");
    }

    #[test]
    fn title_keeps_digits_that_are_not_years() {
        assert_eq!(clean_title("Notes_20201_v2.pdf"), "Notes 20201 v2");
        assert_eq!(clean_title("2019-2020_seminar.pdf"), "seminar");
    }

    #[test]
    fn title_collapses_whitespace() {
        assert_eq!(clean_title("a__b--c   d.pdf"), "a b c d");
    }

    #[test]
    fn title_falls_back_to_filename_when_empty() {
        assert_eq!(clean_title("2020.pdf"), "2020.pdf");
        assert_eq!(clean_title("__.pdf"), "__.pdf");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("Paper.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("README"), None);
    }
}
