//! # refharness
//!
//! Search bibliographic references scattered across Google Drive, a GitHub
//! repository and local folders as if they were one library.
//!
//! Each source is a collector that caches a file listing. The search
//! engine reads those listings, infers author, year and a clean title from
//! every filename, scores the results against the query, and returns them
//! in a deterministic order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌─────────┐   ┌────────┐
//! │  Collectors  │──▶│ Normalize  │──▶│  Score  │──▶│  Rank  │
//! │ Drive/GH/FS  │   │ author/yr  │   │ filter  │   │ order  │
//! └──────────────┘   └────────────┘   └─────────┘   └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! refs sync                          # refresh every source
//! refs search --keyword hodge        # search all sources
//! refs search -s local -a smith -y 2020
//! refs stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Raw and unified record types |
//! | [`traits`] | Collector trait and registry |
//! | [`connector_drive`] | Google Drive collector |
//! | [`connector_github`] | GitHub collector |
//! | [`connector_fs`] | Local filesystem collector |
//! | [`cache`] | On-disk listing cache |
//! | [`metadata`] | Filename heuristics |
//! | [`normalize`] | Raw → unified record mapping |
//! | [`scoring`] | Relevance scoring |
//! | [`ranking`] | Result ordering |
//! | [`search`] | Search engine and aggregates |
//! | [`error`] | Input errors returned by searches |
//! | [`sources`] | `refs status` and `refs sync` |
//! | [`stats`] | `refs stats`, `refs authors`, `refs years` |

pub mod cache;
pub mod config;
pub mod connector_drive;
pub mod connector_fs;
pub mod connector_github;
pub mod error;
pub mod metadata;
pub mod models;
pub mod normalize;
pub mod ranking;
pub mod scoring;
pub mod search;
pub mod sources;
pub mod stats;
pub mod traits;
