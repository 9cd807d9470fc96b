//! Per-source fetchers: retrieve one configured feed and normalize its entries.
//!
//! [`SourceFetcher`] is the closed set of source types. It is built from a
//! [`SourceConfig`] once, before any network call, so a source with a missing
//! locator fails fast with a [`ConfigError`]. Adding a source type means adding
//! a variant here; the aggregator only sees `fetch` and `source_url`.

use feed_rs::model::Feed;

use crate::config::{ConfigError, SourceConfig, SourceKind};
use crate::feed::fetcher::{fetch_bytes, FetchError, FetchOptions};
use crate::feed::item::NormalizedItem;
use crate::feed::parser::{
    entry_content, entry_link, entry_media_description, entry_summary, entry_title, parse_feed,
};
use crate::util::validate_url;

/// A fetcher for one source, selected by the source's `type`.
#[derive(Debug, Clone)]
pub enum SourceFetcher {
    YouTube(YouTubeFetcher),
    GenericRss(GenericRssFetcher),
}

impl SourceFetcher {
    /// Builds the fetcher matching `config.kind`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingField`] - `channel_id` / `rss_url` absent or blank
    /// - [`ConfigError::InvalidUrl`] - `rss_url` is not an absolute http(s) URL
    /// - [`ConfigError::UnknownSourceType`] - unrecognized `type`
    pub fn from_config(config: &SourceConfig, options: &FetchOptions) -> Result<Self, ConfigError> {
        match &config.kind {
            SourceKind::YouTubeChannel => Ok(SourceFetcher::YouTube(YouTubeFetcher::new(
                config,
                &options.youtube_feed_url,
            )?)),
            SourceKind::GenericRss => Ok(SourceFetcher::GenericRss(GenericRssFetcher::new(
                config,
            )?)),
            SourceKind::Unknown(kind) => Err(ConfigError::UnknownSourceType {
                source_id: config.id.clone(),
                kind: kind.clone(),
            }),
        }
    }

    /// Fetches and normalizes the source's entries.
    pub async fn fetch(
        &self,
        client: &reqwest::Client,
        options: &FetchOptions,
    ) -> Result<Vec<NormalizedItem>, FetchError> {
        let bytes = fetch_bytes(client, self.source_url(), options.timeout).await?;
        Ok(self.normalize(&bytes))
    }

    /// URL credited in the output's per-item `<source>` element.
    pub fn source_url(&self) -> &str {
        match self {
            SourceFetcher::YouTube(f) => f.feed_url(),
            SourceFetcher::GenericRss(f) => f.rss_url(),
        }
    }

    /// Parses a fetched document into items.
    ///
    /// A document that is not RSS or Atom at all yields no items rather than an
    /// error, the same as a feed whose entries all lack dates.
    pub fn normalize(&self, bytes: &[u8]) -> Vec<NormalizedItem> {
        let feed = match parse_feed(bytes) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(
                    source_id = %self.origin().id,
                    url = %self.source_url(),
                    error = %e,
                    "Feed could not be parsed, treating as empty"
                );
                return Vec::new();
            }
        };

        let items = match self {
            SourceFetcher::YouTube(f) => f.normalize(feed),
            SourceFetcher::GenericRss(f) => f.normalize(feed),
        };

        tracing::debug!(
            source_id = %self.origin().id,
            items = items.len(),
            "Normalized feed entries"
        );
        items
    }

    fn origin(&self) -> &Origin {
        match self {
            SourceFetcher::YouTube(f) => &f.origin,
            SourceFetcher::GenericRss(f) => &f.origin,
        }
    }
}

/// Source identity stamped onto every item.
#[derive(Debug, Clone)]
struct Origin {
    id: String,
    display_name: String,
}

impl Origin {
    fn new(config: &SourceConfig) -> Self {
        Self {
            id: config.id.clone(),
            display_name: config.display_name.clone(),
        }
    }

    fn item(
        &self,
        title: String,
        url: String,
        published_at: chrono::DateTime<chrono::Utc>,
        description: Option<String>,
    ) -> NormalizedItem {
        NormalizedItem {
            source_id: self.id.clone(),
            source_display_name: self.display_name.clone(),
            title,
            url,
            published_at,
            description,
        }
    }
}

/// Returns the trimmed value of a required locator field.
fn require<'a>(
    config: &SourceConfig,
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            source_id: config.id.clone(),
            kind: config.kind.clone(),
            field,
        })
}

// ============================================================================
// YouTube
// ============================================================================

/// Videos of one YouTube channel, via the channel's public Atom feed.
#[derive(Debug, Clone)]
pub struct YouTubeFetcher {
    origin: Origin,
    feed_url: String,
}

impl YouTubeFetcher {
    /// `feed_base` is normally [`crate::feed::YOUTUBE_FEED_URL`].
    pub fn new(config: &SourceConfig, feed_base: &str) -> Result<Self, ConfigError> {
        let channel_id = require(config, config.channel_id.as_deref(), "channel_id")?;
        let feed_url = url::Url::parse_with_params(feed_base, &[("channel_id", channel_id)])
            .map_err(|e| ConfigError::InvalidUrl {
                source_id: config.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            origin: Origin::new(config),
            feed_url: feed_url.into(),
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Only `published` counts; an entry without it is dropped even if it has
    /// `updated`.
    fn normalize(&self, feed: Feed) -> Vec<NormalizedItem> {
        feed.entries
            .iter()
            .filter_map(|entry| {
                let published_at = entry.published?;
                let description =
                    entry_summary(entry).or_else(|| entry_media_description(entry));
                Some(self.origin.item(
                    entry_title(entry),
                    entry_link(entry),
                    published_at,
                    description,
                ))
            })
            .collect()
    }
}

// ============================================================================
// Generic RSS / Atom
// ============================================================================

/// Any RSS or Atom feed reachable over http(s).
#[derive(Debug, Clone)]
pub struct GenericRssFetcher {
    origin: Origin,
    rss_url: String,
}

impl GenericRssFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        let rss_url = require(config, config.rss_url.as_deref(), "rss_url")?;
        validate_url(rss_url).map_err(|e| ConfigError::InvalidUrl {
            source_id: config.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            origin: Origin::new(config),
            rss_url: rss_url.to_string(),
        })
    }

    pub fn rss_url(&self) -> &str {
        &self.rss_url
    }

    /// Date is `published`, else `updated`; description is the summary, else
    /// the content body.
    fn normalize(&self, feed: Feed) -> Vec<NormalizedItem> {
        feed.entries
            .iter()
            .filter_map(|entry| {
                let published_at = entry.published.or(entry.updated)?;
                let description = entry_summary(entry).or_else(|| entry_content(entry));
                Some(self.origin.item(
                    entry_title(entry),
                    entry_link(entry),
                    published_at,
                    description,
                ))
            })
            .collect()
    }
}
