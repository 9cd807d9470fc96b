use chrono::{DateTime, Utc};

/// One content item, independent of the format it was fetched in.
///
/// `published_at` is not optional: entries without a usable timestamp are
/// dropped before an item is ever constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    /// `id` of the source config this item came from.
    pub source_id: String,
    pub source_display_name: String,
    /// May be empty.
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
}
