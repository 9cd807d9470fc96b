//! Feed ingestion and rendering.
//!
//! - **Parsing**: RSS/Atom bytes into `feed-rs` entries, with one lenient
//!   timestamp parser for every date field
//! - **Fetching**: bounded-time, size-limited HTTP retrieval
//! - **Sources**: per-source-type normalization into [`NormalizedItem`]
//! - **Building**: merged items rendered as a single RSS 2.0 document
//!
//! # Example
//!
//! ```ignore
//! use feedmerge::feed::{FeedBuilder, FetchOptions, SourceFetcher};
//!
//! let options = FetchOptions::default();
//! let fetcher = SourceFetcher::from_config(&source, &options)?;
//! let items = fetcher.fetch(&client, &options).await?;
//! let xml = FeedBuilder::new(&config.feed).build(&items, &source_urls)?;
//! ```

mod builder;
mod fetcher;
mod item;
mod parser;
mod sources;

pub use builder::FeedBuilder;
pub use fetcher::{fetch_bytes, FetchError, FetchOptions, DEFAULT_TIMEOUT, YOUTUBE_FEED_URL};
pub use item::NormalizedItem;
pub use parser::{parse_feed, parse_timestamp};
pub use sources::{GenericRssFetcher, SourceFetcher, YouTubeFetcher};
