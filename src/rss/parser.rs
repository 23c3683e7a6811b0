//! Feed parsing logic for RSS and Atom.

use feed_rs::model::Entry;
use feed_rs::parser;
use std::borrow::Cow;
use tracing::{debug, warn};

use super::extensions::{scan_extensions, EntryExtensions};
use super::types::FeedEntry;
use super::util::{cleanup_xml, looks_like_feed, to_utf8};
use crate::error::{Result, WatchError};
use crate::TARGET_WEB_REQUEST;

/// Parses a feed body into entries, in feed order.
///
/// A body that fails to parse is cleaned once and retried; if that also fails
/// the whole feed is rejected.
pub fn parse_feed(body: &[u8], url: &str) -> Result<Vec<FeedEntry>> {
    let (feed, source) = match parser::parse(body) {
        Ok(feed) => (feed, Cow::Borrowed(body)),
        Err(first_err) => {
            let cleaned = cleanup_xml(&String::from_utf8_lossy(body));
            if !looks_like_feed(&cleaned) {
                let preview = cleaned.chars().take(100).collect::<String>();
                return Err(WatchError::fetch(
                    url,
                    format!(
                        "content is not an RSS or Atom feed ({}). Content preview: {}",
                        first_err, preview
                    ),
                ));
            }

            match parser::parse(cleaned.as_bytes()) {
                Ok(feed) => {
                    warn!(target: TARGET_WEB_REQUEST, "Feed from {} parsed only after XML cleanup: {}", url, first_err);
                    (feed, Cow::Owned(cleaned.into_bytes()))
                }
                Err(second_err) => {
                    return Err(WatchError::fetch(
                        url,
                        format!(
                            "failed to parse feed even after cleanup. First error: {}. Second error: {}",
                            first_err, second_err
                        ),
                    ));
                }
            }
        }
    };

    // feed-rs already accepted the document; the raw fields are best effort.
    let extensions = match scan_extensions(&to_utf8(&source)) {
        Ok(extensions) => extensions,
        Err(err) => {
            warn!(target: TARGET_WEB_REQUEST, "Failed to scan raw entry fields in feed from {}: {}", url, err);
            Vec::new()
        }
    };
    if !extensions.is_empty() && extensions.len() != feed.entries.len() {
        warn!(
            target: TARGET_WEB_REQUEST,
            "Feed from {} has {} entries but {} raw items, raw fields may be missing",
            url,
            feed.entries.len(),
            extensions.len()
        );
    }

    debug!(target: TARGET_WEB_REQUEST, "Parsed feed with {} entries", feed.entries.len());

    Ok(feed
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let raw = extensions.get(index).cloned().unwrap_or_default();
            to_feed_entry(entry, raw)
        })
        .collect())
}

fn to_feed_entry(entry: Entry, raw: EntryExtensions) -> FeedEntry {
    let published = raw
        .published()
        .or_else(|| entry.published.or(entry.updated).map(|d| d.to_rfc3339()))
        .unwrap_or_default();

    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    FeedEntry {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        published,
        link: entry
            .links
            .first()
            .map(|link| link.href.clone())
            .unwrap_or_default(),
        description,
        severity: raw.severity.unwrap_or_default(),
    }
}
