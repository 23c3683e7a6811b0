//! Advisory feed fetching and parsing.
//!
//! The feed is downloaded once per run, parsed with `feed-rs`, and enriched
//! with the raw fields `feed-rs` normalises away (see `extensions`).

mod client;
mod extensions;
mod parser;
mod types;
mod util;

pub use self::client::{create_http_client, FeedClient};
pub use self::extensions::{scan_extensions, EntryExtensions};
pub use self::parser::parse_feed;
pub use self::types::*;
pub use self::util::{cleanup_xml, is_valid_url};
