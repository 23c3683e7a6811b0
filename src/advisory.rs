use serde::{Deserialize, Serialize};

use crate::rss::FeedEntry;
use crate::sanitize::sanitize;

/// A security advisory as stored in the `cve` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    /// Dedup key. The feed has no separate id, so this is the entry title;
    /// two advisories sharing a title collapse into one.
    pub identifier: String,
    pub title: String,
    /// Feed-native timestamp, never reparsed.
    pub published: String,
    /// Plain text, markup and entities removed.
    pub description: String,
    pub severity: String,
    pub link: String,
}

impl Advisory {
    pub fn from_entry(entry: &FeedEntry) -> Self {
        Advisory {
            identifier: entry.title.clone(),
            title: entry.title.clone(),
            published: entry.published.clone(),
            description: sanitize(&entry.description),
            severity: entry.severity.clone(),
            link: entry.link.clone(),
        }
    }
}
