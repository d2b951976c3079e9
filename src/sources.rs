//! Source status and refresh commands (`refs status`, `refs sync`).

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::models::{SourceKind, SourceSelector};
use crate::stats::format_ts_relative;
use crate::traits::CollectorRegistry;

/// Status of one source as shown by `refs status`.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub status: String,
    pub count: usize,
    pub last_refresh: Option<i64>,
}

/// Status of all three sources, configured or not.
pub fn get_sources(config: &Config, registry: &CollectorRegistry) -> Vec<SourceStatus> {
    SourceKind::ALL
        .iter()
        .map(|&kind| {
            let name = kind.key().to_string();
            if let Some(collector) = registry.find(kind) {
                return SourceStatus {
                    name,
                    status: "OK".to_string(),
                    count: collector.count(),
                    last_refresh: collector.last_refresh().map(|t| t.timestamp()),
                };
            }
            let status = match registry.unavailable().iter().find(|u| u.kind == kind) {
                Some(u) => format!("UNAVAILABLE ({})", u.reason),
                None if is_configured(config, kind) => "UNAVAILABLE".to_string(),
                None => "NOT CONFIGURED".to_string(),
            };
            SourceStatus {
                name,
                status,
                count: 0,
                last_refresh: None,
            }
        })
        .collect()
}

fn is_configured(config: &Config, kind: SourceKind) -> bool {
    match kind {
        SourceKind::CloudStore => config.sources.drive.is_some(),
        SourceKind::VersionControl => config.sources.github.is_some(),
        SourceKind::Local => config.sources.local.is_some(),
    }
}

pub fn run_status(config: &Config, registry: &CollectorRegistry) -> Result<()> {
    println!("{:<10} {:>7}  {:<16} STATUS", "SOURCE", "FILES", "LAST SYNC");
    for s in get_sources(config, registry) {
        let last = s
            .last_refresh
            .map(format_ts_relative)
            .unwrap_or_else(|| "never".to_string());
        println!("{:<10} {:>7}  {:<16} {}", s.name, s.count, last, s.status);
    }
    println!();
    println!("  Cache: {}", config.cache.dir.display());
    Ok(())
}

/// Refresh every selected collector, reporting each outcome.
///
/// Failures are reported per source and do not stop the others.
pub async fn run_sync(registry: &CollectorRegistry, selector: SourceSelector) -> Result<()> {
    let selected: Vec<_> = registry
        .collectors()
        .iter()
        .filter(|c| selector.includes(c.kind()))
        .collect();

    if selected.is_empty() {
        println!("No available sources to sync.");
        return Ok(());
    }

    let outcomes = futures::future::join_all(
        selected
            .iter()
            .map(|c| async move { (c.kind(), c.refresh().await) }),
    )
    .await;

    for (kind, outcome) in outcomes {
        match outcome {
            Ok(count) => println!("{:<14} {} files", kind.label(), count),
            Err(e) => {
                tracing::warn!(source = %kind, error = %e, "sync failed");
                println!("{:<14} FAILED: {:#}", kind.label(), e);
            }
        }
    }
    Ok(())
}
