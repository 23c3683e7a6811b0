//! Type definitions for the RSS module.

/// One feed item with the fields the pipeline consumes. Missing fields are
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// Timestamp text exactly as it appears in the feed.
    pub published: String,
    pub link: String,
    /// HTML-bearing description, not yet sanitized.
    pub description: String,
    /// Custom `<severity>` element, `""` when the feed omits it.
    pub severity: String,
}

pub const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9";
pub const USER_AGENT: &str = concat!("cvewatch/", env!("CARGO_PKG_VERSION"));
