//! Merge YouTube channels and RSS/Atom feeds into one RSS 2.0 feed.
//!
//! A run loads [`config::AppConfig`], fetches each enabled source in order
//! ([`aggregator`]), renders the merged items ([`feed::FeedBuilder`]) and
//! writes the result atomically ([`output`]). [`pipeline::run`] ties the steps
//! together for the binary.

pub mod aggregator;
pub mod config;
pub mod feed;
pub mod output;
pub mod pipeline;
pub mod util;
