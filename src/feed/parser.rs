use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser::{self, ParseFeedError};
use regex::Regex;
use std::sync::OnceLock;

/// Zone-less layouts, interpreted as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Offset layouts that RFC 3339 rejects but ISO 8601 allows.
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// RFC 1123 without a weekday, once the zone is numeric.
const RFC1123_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// Rewrites applied to near-RFC 2822 dates before a second parse attempt.
///
/// Real feeds routinely carry a weekday that does not match the date (or is
/// spelled out), `UTC`/`Z`/`-0000` zones, full month names, `24:` midnight
/// and single-digit hours. chrono rejects all of these.
fn rfc2822_cleanups() -> &'static [(Regex, &'static str)] {
    static CLEANUPS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    CLEANUPS.get_or_init(|| {
        [
            (r"^[A-Za-z]+\.?,\s*", ""),
            (r"\s+(?:UTC|Z|-0000)$", " +0000"),
            (
                r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?",
                "$1",
            ),
            (r" 24:", " 00:"),
            (r" (\d):", " 0$1:"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            let regex = Regex::new(pattern).expect("static date cleanup pattern is valid");
            (regex, replacement)
        })
        .collect()
    })
}

/// Parses RSS or Atom bytes, auto-detecting the format.
///
/// Every date field in the document goes through [`parse_timestamp`], so RSS
/// `pubDate` (RFC 2822) and Atom `published`/`updated` (ISO 8601) share one set
/// of rules. A date that fails to parse leaves the field `None` rather than
/// failing the document.
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, ParseFeedError> {
    parser::Builder::new()
        .timestamp_parser(parse_timestamp)
        .build()
        .parse(bytes)
}

/// Parses a feed timestamp into UTC.
///
/// Accepts RFC 3339 (a `Z` suffix is UTC), RFC 2822 / RFC 822 including the
/// obsolete zone names (`GMT`, `EST`, ...), ISO 8601 with a space separator or
/// a colon-less offset, and zone-less ISO 8601 date-times or dates, which are
/// taken as UTC. RFC 2822 dates that chrono rejects as written (wrong or
/// spelled-out weekday, `UTC` zone, full month name, hour `24`) are retried
/// after normalization, which also lets `16 January 2024` through as midnight
/// UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    parse_lenient_rfc2822(text)
}

fn parse_lenient_rfc2822(text: &str) -> Option<DateTime<Utc>> {
    let mut cleaned = text.to_string();
    for (regex, replacement) in rfc2822_cleanups() {
        cleaned = regex.replace_all(&cleaned, *replacement).into_owned();
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&cleaned, RFC1123_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(&cleaned, "%d %b %Y")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Entry title, empty when the feed omits it.
pub(crate) fn entry_title(entry: &Entry) -> String {
    entry
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .unwrap_or_default()
}

/// The entry's `alternate` link, falling back to its first link.
pub(crate) fn entry_link(entry: &Entry) -> String {
    entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default()
}

pub(crate) fn entry_summary(entry: &Entry) -> Option<String> {
    entry
        .summary
        .as_ref()
        .map(|t| t.content.clone())
        .filter(|s| !s.trim().is_empty())
}

pub(crate) fn entry_content(entry: &Entry) -> Option<String> {
    entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .filter(|s| !s.trim().is_empty())
}

/// `media:description`, which is where YouTube puts the video description.
pub(crate) fn entry_media_description(entry: &Entry) -> Option<String> {
    entry
        .media
        .iter()
        .filter_map(|m| m.description.as_ref())
        .map(|d| d.content.clone())
        .find(|s| !s.trim().is_empty())
}
