use anyhow::{Context, Result};
use std::path::Path;

use crate::aggregator::{aggregate, AggregateError};
use crate::config::AppConfig;
use crate::feed::{FeedBuilder, FetchOptions};
use crate::output::write_atomic;

/// How a run ended, short of an I/O or render error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The feed was written with `items` entries.
    Written { items: usize, failed_sources: usize },
    /// Every enabled source failed; the output file was not touched.
    AllSourcesFailed { failed_sources: usize },
}

/// Fetch → merge → render → write, once.
///
/// # Errors
///
/// Only rendering or writing the output can fail here; source failures are
/// reported through [`RunOutcome`].
pub async fn run(
    config: &AppConfig,
    client: &reqwest::Client,
    options: &FetchOptions,
    output: &Path,
) -> Result<RunOutcome> {
    let aggregation = match aggregate(config, client, options).await {
        Ok(aggregation) => aggregation,
        Err(AggregateError::AllSourcesFailed { failures }) => {
            tracing::warn!(
                path = %output.display(),
                failed = failures.len(),
                "All sources failed, preserving existing output"
            );
            return Ok(RunOutcome::AllSourcesFailed {
                failed_sources: failures.len(),
            });
        }
    };

    let xml = FeedBuilder::new(&config.feed)
        .build(&aggregation.items, &aggregation.source_urls)
        .context("Failed to render feed")?;

    let items = aggregation.items.len().min(config.feed.max_items);
    tracing::info!(path = %output.display(), items = items, "Writing feed");
    write_atomic(output, &xml)
        .with_context(|| format!("Failed to write feed to {}", output.display()))?;

    Ok(RunOutcome::Written {
        items,
        failed_sources: aggregation.failures.len(),
    })
}
