//! Error types surfaced to callers of the search engine.
//!
//! Collector, refresh, conversion and extraction failures are contained
//! where they happen (logged and downgraded). Only bad input reaches the
//! caller, and it does so through [`SearchError`].

/// Input-validation errors returned by [`SearchEngine`](crate::search::SearchEngine).
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The source selector named no known backend.
    #[error("unknown source '{0}': expected drive, github, local, or all")]
    UnknownSource(String),

    /// A query field could not be interpreted.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Convenience alias for search results.
pub type Result<T> = std::result::Result<T, SearchError>;
