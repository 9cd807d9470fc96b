//! Runs every enabled source and merges the results.
//!
//! Sources are fetched one at a time in config order. A source that fails,
//! whether at construction (bad config) or during the fetch, is recorded and
//! skipped; it never stops the run. Only when every enabled source failed does
//! the run itself fail, so the caller can leave the previous output in place.

use std::collections::HashMap;
use thiserror::Error;

use crate::config::{AppConfig, ConfigError, SourceConfig, SourceKind};
use crate::feed::{FetchError, FetchOptions, NormalizedItem, SourceFetcher};

/// Why a single source produced no items.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A source that failed during this run.
#[derive(Debug)]
pub struct SourceFailure {
    pub source_id: String,
    pub kind: SourceKind,
    pub error: SourceError,
}

#[derive(Debug, Error)]
pub enum AggregateError {
    /// Nothing succeeded and at least one source failed.
    #[error("All {} enabled sources failed", .failures.len())]
    AllSourcesFailed { failures: Vec<SourceFailure> },
}

/// Merged output of a run, ready for [`crate::feed::FeedBuilder`].
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Items from all successful sources, in source order then feed order.
    pub items: Vec<NormalizedItem>,
    /// `source_id -> source_url` for each successful source.
    pub source_urls: HashMap<String, String>,
    pub succeeded: usize,
    pub failures: Vec<SourceFailure>,
}

/// Fetches all enabled sources in `config`, sequentially.
///
/// # Errors
///
/// [`AggregateError::AllSourcesFailed`] when no source succeeded and at least
/// one failed. With no enabled sources at all the run succeeds with no items.
pub async fn aggregate(
    config: &AppConfig,
    client: &reqwest::Client,
    options: &FetchOptions,
) -> Result<Aggregation, AggregateError> {
    let enabled: Vec<&SourceConfig> = config.enabled_sources().collect();
    tracing::info!(sources = enabled.len(), "Processing enabled sources");

    let mut aggregation = Aggregation::default();

    for source in enabled {
        match fetch_source(source, client, options).await {
            Ok((items, source_url)) => {
                tracing::info!(
                    source_id = %source.id,
                    source_type = %source.kind,
                    items = items.len(),
                    "Source fetched"
                );
                if aggregation
                    .source_urls
                    .insert(source.id.clone(), source_url)
                    .is_some()
                {
                    tracing::warn!(
                        source_id = %source.id,
                        "Duplicate source id, <source> attribution uses the last one"
                    );
                }
                aggregation.items.extend(items);
                aggregation.succeeded += 1;
            }
            Err(error) => {
                tracing::error!(
                    source_id = %source.id,
                    source_type = %source.kind,
                    error = %error,
                    "Source failed"
                );
                aggregation.failures.push(SourceFailure {
                    source_id: source.id.clone(),
                    kind: source.kind.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        items = aggregation.items.len(),
        succeeded = aggregation.succeeded,
        failed = aggregation.failures.len(),
        "Processing complete"
    );

    if aggregation.succeeded == 0 && !aggregation.failures.is_empty() {
        return Err(AggregateError::AllSourcesFailed {
            failures: aggregation.failures,
        });
    }

    Ok(aggregation)
}

async fn fetch_source(
    source: &SourceConfig,
    client: &reqwest::Client,
    options: &FetchOptions,
) -> Result<(Vec<NormalizedItem>, String), SourceError> {
    let fetcher = SourceFetcher::from_config(source, options)?;
    let items = fetcher.fetch(client, options).await?;
    Ok((items, fetcher.source_url().to_string()))
}
