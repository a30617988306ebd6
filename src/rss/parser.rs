use crate::error::{AggregatorError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub guid: Option<String>,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub enclosures: Vec<Enclosure>,
    pub image_url: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// Parses an `itunes:duration` value, which podcast feeds render as
/// `HH:MM:SS`, `MM:SS`, or a bare seconds count.
fn parse_itunes_duration(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parts: Vec<&str> = raw.split(':').collect();
    match parts.len() {
        1 => parts[0].parse().ok(),
        2 => {
            let minutes: i64 = parts[0].parse().ok()?;
            let seconds: i64 = parts[1].parse().ok()?;
            Some(minutes * 60 + seconds)
        }
        3 => {
            let hours: i64 = parts[0].parse().ok()?;
            let minutes: i64 = parts[1].parse().ok()?;
            let seconds: i64 = parts[2].parse().ok()?;
            Some(hours * 3600 + minutes * 60 + seconds)
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: Option<String>,
}

/// Thin wrapper around `feed_rs` that deduplicates entries by GUID (falling
/// back to URL) across repeated parses of the same feed, so a run that
/// re-fetches an unchanged feed doesn't re-surface items already collected
/// earlier the same day.
pub struct FeedParser {
    seen_guids: HashSet<String>,
    seen_urls: HashSet<String>,
}

impl FeedParser {
    pub fn new() -> Self {
        FeedParser { seen_guids: HashSet::new(), seen_urls: HashSet::new() }
    }

    pub fn parse(&mut self, content: &str) -> Result<ParsedFeed> {
        let feed = feed_rs::parser::parse(content.as_bytes())?;

        let title = feed.title.map(|t| t.content);
        let description = feed.description.map(|d| d.content);

        let entries = feed
            .entries
            .into_iter()
            .filter_map(|e| self.parse_entry(e))
            .collect();

        Ok(ParsedFeed { title, description, entries })
    }

    fn parse_entry(&mut self, entry: feed_rs::model::Entry) -> Option<ParsedEntry> {
        let url = entry.links.first()?.href.clone();

        let guid = (!entry.id.is_empty()).then(|| entry.id.clone());
        if let Some(guid) = &guid {
            if !self.seen_guids.insert(guid.clone()) {
                debug!(%guid, "skipping duplicate entry");
                return None;
            }
        } else if !self.seen_urls.insert(url.clone()) {
            debug!(%url, "skipping duplicate entry");
            return None;
        }

        let title = entry.title.map(|t| t.content).unwrap_or_else(|| "Untitled".to_string());
        let summary = entry.summary.map(|s| s.content);
        let content = entry.content.as_ref().and_then(|c| c.body.clone()).or_else(|| summary.clone());
        let author = entry.authors.first().map(|a| a.name.clone());
        let published_at = entry.published.or(entry.updated).map(|dt| dt.with_timezone(&Utc));

        let enclosures = entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|c| c.url.as_ref().map(|u| Enclosure { url: u.to_string(), mime_type: c.content_type.as_ref().map(|m| m.to_string()) }))
            .collect();

        let image_url = entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .next()
            .map(|t| t.image.uri.clone());

        let duration_seconds = entry
            .extensions
            .get("itunes")
            .and_then(|ns| ns.get("duration"))
            .and_then(|exts| exts.first())
            .and_then(|ext| ext.value.as_deref())
            .and_then(parse_itunes_duration);

        Some(ParsedEntry {
            guid,
            url,
            title,
            summary,
            content,
            author,
            published_at,
            enclosures,
            image_url,
            duration_seconds,
        })
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let lower = content.to_lowercase();
        let has_indicators = lower.contains("<rss")
            || lower.contains("<feed")
            || lower.contains("xmlns=\"http://www.w3.org/2005/atom\"")
            || lower.contains("<channel");
        has_indicators
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Test Feed</title>
<item><guid>a1</guid><title>First</title><link>https://example.com/1</link><description>hello</description></item>
<item><guid>a2</guid><title>Second</title><link>https://example.com/2</link><description>world</description></item>
</channel></rss>"#;

    #[test]
    fn parses_entries_and_dedupes_by_guid() {
        let mut parser = FeedParser::new();
        let feed = parser.parse(SAMPLE).unwrap();
        assert_eq!(feed.entries.len(), 2);
        let feed2 = parser.parse(SAMPLE).unwrap();
        assert_eq!(feed2.entries.len(), 0);
    }

    #[test]
    fn parses_itunes_duration_in_all_three_forms() {
        assert_eq!(parse_itunes_duration("1:02:03"), Some(3723));
        assert_eq!(parse_itunes_duration("02:03"), Some(123));
        assert_eq!(parse_itunes_duration("45"), Some(45));
        assert_eq!(parse_itunes_duration(""), None);
        assert_eq!(parse_itunes_duration("not-a-duration"), None);
    }
}
