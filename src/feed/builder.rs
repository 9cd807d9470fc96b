use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::Cursor;

use crate::config::FeedConfig;
use crate::feed::item::NormalizedItem;
use crate::util::strip_invalid_xml_chars;

/// Renders normalized items as an RSS 2.0 document.
pub struct FeedBuilder<'a> {
    config: &'a FeedConfig,
}

impl<'a> FeedBuilder<'a> {
    pub fn new(config: &'a FeedConfig) -> Self {
        Self { config }
    }

    /// Builds the feed with `lastBuildDate` set to the current time.
    ///
    /// See [`FeedBuilder::build_at`].
    pub fn build(
        &self,
        items: &[NormalizedItem],
        source_urls: &HashMap<String, String>,
    ) -> Result<String> {
        self.build_at(items, source_urls, Utc::now())
    }

    /// Builds the feed as of `now`.
    ///
    /// Items are ordered newest first; items with equal `published_at` keep
    /// their input order. At most `max_items` are emitted. `source_urls` maps a
    /// source id to the URL credited in each item's `<source>` element; items
    /// whose source has no entry (or an empty one) get no `<source>`.
    pub fn build_at(
        &self,
        items: &[NormalizedItem],
        source_urls: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let mut sorted: Vec<&NormalizedItem> = items.iter().collect();
        // sort_by is stable, so ties stay in input order
        sorted.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        sorted.truncate(self.config.max_items);

        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .context("Failed to write XML declaration")?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        writer
            .write_event(Event::Start(rss))
            .context("Failed to write rss element")?;
        writer
            .write_event(Event::Start(BytesStart::new("channel")))
            .context("Failed to write channel element")?;

        write_text_element(&mut writer, "title", &self.config.title)?;
        write_text_element(&mut writer, "link", &self.config.link)?;
        write_text_element(&mut writer, "description", &self.config.description)?;
        write_text_element(&mut writer, "language", &self.config.language)?;
        write_text_element(&mut writer, "lastBuildDate", &now.to_rfc2822())?;

        for item in sorted {
            write_item(&mut writer, item, source_urls)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("channel")))
            .context("Failed to write channel end")?;
        writer
            .write_event(Event::End(BytesEnd::new("rss")))
            .context("Failed to write rss end")?;

        let result = writer.into_inner().into_inner();
        String::from_utf8(result).context("Generated feed contains invalid UTF-8")
    }
}

fn write_item(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    item: &NormalizedItem,
    source_urls: &HashMap<String, String>,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    let description = item
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(&item.source_display_name);

    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.url)?;
    write_text_element(writer, "description", description)?;
    write_text_element(writer, "pubDate", &item.published_at.to_rfc2822())?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "true"));
    write_element_with(writer, guid, &item.url)?;

    if let Some(url) = source_urls
        .get(&item.source_id)
        .filter(|url| !url.is_empty())
    {
        let url = strip_invalid_xml_chars(url);
        let mut source = BytesStart::new("source");
        source.push_attribute(("url", &*url));
        write_element_with(writer, source, &item.source_display_name)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<()> {
    write_element_with(writer, BytesStart::new(name), text)
}

/// Writes `<start>text</start>`, escaping `text`.
fn write_element_with(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    start: BytesStart<'_>,
    text: &str,
) -> Result<()> {
    let end = start.to_end().into_owned();
    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
    let text = strip_invalid_xml_chars(text);

    writer
        .write_event(Event::Start(start))
        .with_context(|| format!("Failed to write {} element", name))?;
    writer
        .write_event(Event::Text(BytesText::new(&text)))
        .with_context(|| format!("Failed to write {} text", name))?;
    writer
        .write_event(Event::End(end))
        .with_context(|| format!("Failed to write {} end", name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde::Deserialize;

    // ------------------------------------------------------------------------
    // Output schema, read back with quick-xml's serde support
    // ------------------------------------------------------------------------

    #[derive(Debug, Deserialize)]
    struct Rss {
        #[serde(rename = "@version")]
        version: String,
        channel: Channel,
    }

    #[derive(Debug, Deserialize)]
    struct Channel {
        title: String,
        link: String,
        description: String,
        language: String,
        #[serde(rename = "lastBuildDate")]
        last_build_date: String,
        #[serde(default, rename = "item")]
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize)]
    struct Item {
        #[serde(default)]
        title: String,
        link: String,
        description: String,
        #[serde(rename = "pubDate")]
        pub_date: String,
        guid: Guid,
        source: Option<Source>,
    }

    #[derive(Debug, Deserialize)]
    struct Guid {
        #[serde(rename = "@isPermaLink")]
        is_perma_link: String,
        #[serde(default, rename = "$text")]
        value: String,
    }

    #[derive(Debug, Deserialize)]
    struct Source {
        #[serde(rename = "@url")]
        url: String,
        #[serde(default, rename = "$text")]
        name: String,
    }

    fn parse(xml: &str) -> Rss {
        quick_xml::de::from_str(xml).expect("builder output should deserialize")
    }

    fn feed_config(max_items: usize) -> FeedConfig {
        FeedConfig {
            title: "Test Feed".to_string(),
            description: "Test feed description".to_string(),
            link: "https://example.com/feed.xml".to_string(),
            language: "en".to_string(),
            max_items,
        }
    }

    fn item(
        source_id: &str,
        display_name: &str,
        title: &str,
        url: &str,
        published_at: DateTime<Utc>,
        description: Option<&str>,
    ) -> NormalizedItem {
        NormalizedItem {
            source_id: source_id.to_string(),
            source_display_name: display_name.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            published_at,
            description: description.map(String::from),
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
    }

    fn sample_items() -> Vec<NormalizedItem> {
        vec![
            item(
                "source_a",
                "Source A",
                "Item 1",
                "https://example.com/1",
                Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
                Some("Description 1"),
            ),
            item(
                "source_b",
                "Source B",
                "Item 2",
                "https://example.com/2",
                Utc.with_ymd_and_hms(2024, 1, 14, 8, 0, 0).unwrap(),
                Some("Description 2"),
            ),
            item(
                "source_a",
                "Source A",
                "Item 3",
                "https://example.com/3",
                Utc.with_ymd_and_hms(2024, 1, 16, 12, 0, 0).unwrap(),
                None,
            ),
        ]
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()
    }

    fn titles(rss: &Rss) -> Vec<&str> {
        rss.channel.items.iter().map(|i| i.title.as_str()).collect()
    }

    // ------------------------------------------------------------------------
    // Document shape
    // ------------------------------------------------------------------------

    #[test]
    fn test_starts_with_declaration_and_newline() {
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&sample_items(), &HashMap::new())
            .unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">"));
    }

    #[test]
    fn test_channel_metadata() {
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build_at(&sample_items(), &HashMap::new(), fixed_now())
            .unwrap();
        let rss = parse(&xml);

        assert_eq!(rss.version, "2.0");
        assert_eq!(rss.channel.title, "Test Feed");
        assert_eq!(rss.channel.link, "https://example.com/feed.xml");
        assert_eq!(rss.channel.description, "Test feed description");
        assert_eq!(rss.channel.language, "en");
        let last_build = DateTime::parse_from_rfc2822(&rss.channel.last_build_date).unwrap();
        assert_eq!(last_build.with_timezone(&Utc), fixed_now());
        assert!(rss.channel.last_build_date.starts_with("Thu, "));
    }

    #[test]
    fn test_empty_items_list() {
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&[], &HashMap::new())
            .unwrap();
        let rss = parse(&xml);

        assert!(rss.channel.items.is_empty());
        assert_eq!(rss.channel.title, "Test Feed");
        assert_eq!(rss.channel.language, "en");
        assert!(!rss.channel.last_build_date.is_empty());
    }

    // ------------------------------------------------------------------------
    // Ordering and truncation
    // ------------------------------------------------------------------------

    #[test]
    fn test_items_are_sorted_by_date_descending() {
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&sample_items(), &HashMap::new())
            .unwrap();
        assert_eq!(titles(&parse(&xml)), vec!["Item 3", "Item 1", "Item 2"]);
    }

    #[test]
    fn test_max_items_keeps_newest() {
        let items = vec![
            item("s", "S", "16th", "https://example.com/16", day(16), None),
            item("s", "S", "15th", "https://example.com/15", day(15), None),
            item("s", "S", "14th", "https://example.com/14", day(14), None),
        ];
        let config = feed_config(2);
        let xml = FeedBuilder::new(&config)
            .build(&items, &HashMap::new())
            .unwrap();
        assert_eq!(titles(&parse(&xml)), vec!["16th", "15th"]);
    }

    #[test]
    fn test_max_items_limit() {
        let items: Vec<NormalizedItem> = (0..20)
            .map(|i| {
                item(
                    "source",
                    "Source",
                    &format!("Item {}", i),
                    &format!("https://example.com/{}", i),
                    day(i + 1),
                    Some("d"),
                )
            })
            .collect();
        let config = feed_config(5);
        let xml = FeedBuilder::new(&config)
            .build(&items, &HashMap::new())
            .unwrap();
        assert_eq!(parse(&xml).channel.items.len(), 5);
    }

    #[test]
    fn test_zero_max_items_emits_no_items() {
        let config = feed_config(0);
        let xml = FeedBuilder::new(&config)
            .build(&sample_items(), &HashMap::new())
            .unwrap();
        assert!(parse(&xml).channel.items.is_empty());
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let items = vec![
            item("s", "S", "first", "https://example.com/a", day(10), None),
            item("s", "S", "newer", "https://example.com/b", day(11), None),
            item("s", "S", "second", "https://example.com/c", day(10), None),
            item("s", "S", "third", "https://example.com/d", day(10), None),
        ];
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&items, &HashMap::new())
            .unwrap();
        assert_eq!(titles(&parse(&xml)), vec!["newer", "first", "second", "third"]);
    }

    // ------------------------------------------------------------------------
    // Item fields
    // ------------------------------------------------------------------------

    #[test]
    fn test_item_fields() {
        let config = feed_config(10);
        let source_urls = HashMap::from([(
            "source_a".to_string(),
            "https://source-a.com/feed".to_string(),
        )]);
        let xml = FeedBuilder::new(&config)
            .build(&sample_items(), &source_urls)
            .unwrap();
        let rss = parse(&xml);
        let first = &rss.channel.items[0];

        assert_eq!(first.title, "Item 3");
        assert_eq!(first.link, "https://example.com/3");
        // No description: falls back to the source's display name
        assert_eq!(first.description, "Source A");
        assert_eq!(first.pub_date, "Tue, 16 Jan 2024 12:00:00 +0000");
        assert_eq!(first.guid.value, "https://example.com/3");
        assert_eq!(first.guid.is_perma_link, "true");

        let second = &rss.channel.items[1];
        assert_eq!(second.description, "Description 1");
    }

    #[test]
    fn test_empty_description_falls_back_to_display_name() {
        let items = vec![item(
            "s",
            "Display Name",
            "t",
            "https://example.com/x",
            day(1),
            Some(""),
        )];
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&items, &HashMap::new())
            .unwrap();
        assert_eq!(parse(&xml).channel.items[0].description, "Display Name");
    }

    #[test]
    fn test_source_element_only_for_mapped_sources() {
        let config = feed_config(10);
        let source_urls = HashMap::from([
            (
                "source_a".to_string(),
                "https://source-a.com/feed".to_string(),
            ),
            ("source_b".to_string(), String::new()),
        ]);
        let xml = FeedBuilder::new(&config)
            .build(&sample_items(), &source_urls)
            .unwrap();
        let rss = parse(&xml);

        // Item 3 and Item 1 come from source_a
        for item in &rss.channel.items[..2] {
            let source = item.source.as_ref().expect("source_a items have <source>");
            assert_eq!(source.url, "https://source-a.com/feed");
            assert_eq!(source.name, "Source A");
        }
        // Item 2 comes from source_b, mapped to an empty URL
        assert!(rss.channel.items[2].source.is_none());
    }

    #[test]
    fn test_no_source_urls_means_no_source_elements() {
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&sample_items(), &HashMap::new())
            .unwrap();
        assert!(!xml.contains("<source"));
    }

    // ------------------------------------------------------------------------
    // Escaping
    // ------------------------------------------------------------------------

    #[test]
    fn test_special_characters_escaped() {
        let items = vec![item(
            "s",
            "Tom & Jerry",
            "Fish & <Chips> \"quoted\"",
            "https://example.com/?a=1&b=2",
            day(1),
            Some("<p>html</p>"),
        )];
        let source_urls = HashMap::from([(
            "s".to_string(),
            "https://example.com/feed?x=\"1\"&y=2".to_string(),
        )]);
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&items, &source_urls)
            .unwrap();

        assert!(xml.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(xml.contains("https://example.com/?a=1&amp;b=2"));
        assert!(!xml.contains("<p>"));

        let rss = parse(&xml);
        let out = &rss.channel.items[0];
        assert_eq!(out.title, "Fish & <Chips> \"quoted\"");
        assert_eq!(out.link, "https://example.com/?a=1&b=2");
        assert_eq!(out.description, "<p>html</p>");
        let source = out.source.as_ref().unwrap();
        assert_eq!(source.url, "https://example.com/feed?x=\"1\"&y=2");
        assert_eq!(source.name, "Tom & Jerry");
    }

    #[test]
    fn test_invalid_xml_chars_stripped() {
        let items = vec![item(
            "s",
            "S",
            "Bad\u{0b}Title\u{1b}",
            "https://example.com/x",
            day(1),
            None,
        )];
        let config = feed_config(10);
        let xml = FeedBuilder::new(&config)
            .build(&items, &HashMap::new())
            .unwrap();
        assert_eq!(parse(&xml).channel.items[0].title, "BadTitle");
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_sorted_stable_and_truncated(
            // Narrow day range to force plenty of ties
            days in proptest::collection::vec(1u32..5, 0..30),
            max_items in 0usize..40,
        ) {
            let items: Vec<NormalizedItem> = days
                .iter()
                .enumerate()
                .map(|(idx, &d)| {
                    item(
                        "s",
                        "S",
                        &idx.to_string(),
                        &format!("https://example.com/{}", idx),
                        day(d),
                        None,
                    )
                })
                .collect();

            let config = feed_config(max_items);
            let xml = FeedBuilder::new(&config)
                .build_at(&items, &HashMap::new(), fixed_now())
                .unwrap();
            let rss = parse(&xml);

            prop_assert_eq!(rss.channel.items.len(), items.len().min(max_items));

            let out: Vec<(DateTime<Utc>, usize)> = rss
                .channel
                .items
                .iter()
                .map(|i| {
                    let idx: usize = i.title.parse().unwrap();
                    (items[idx].published_at, idx)
                })
                .collect();
            for pair in out.windows(2) {
                let (date_a, idx_a) = pair[0];
                let (date_b, idx_b) = pair[1];
                prop_assert!(date_a >= date_b);
                if date_a == date_b {
                    prop_assert!(idx_a < idx_b);
                }
            }

            for i in &rss.channel.items {
                prop_assert_eq!(&i.guid.value, &i.link);
                prop_assert_eq!(i.guid.is_perma_link.as_str(), "true");
            }
        }
    }
}
