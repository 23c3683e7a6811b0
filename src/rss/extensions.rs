//! Raw per-entry fields that `feed-rs` does not keep.
//!
//! `feed-rs` converts timestamps to `DateTime` and drops elements outside the
//! formats it knows, so the feed-native `pubDate` text and the custom
//! `<severity>` element are recovered here with a second, shallow pass over
//! the same document. Results are in document order, one per `<item>` or
//! `<entry>`.

use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;
use tracing::warn;

use crate::TARGET_WEB_REQUEST;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryExtensions {
    pub pub_date: Option<String>,
    pub updated: Option<String>,
    pub severity: Option<String>,
}

impl EntryExtensions {
    /// `pubDate`/`published` text, falling back to `updated`.
    pub fn published(&self) -> Option<String> {
        self.pub_date.clone().or_else(|| self.updated.clone())
    }
}

#[derive(Clone, Copy)]
enum Field {
    PubDate,
    Updated,
    Severity,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"pubDate" | b"published" => Some(Field::PubDate),
            b"updated" => Some(Field::Updated),
            b"severity" => Some(Field::Severity),
            _ => None,
        }
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

fn append(entry: &mut EntryExtensions, field: Field, text: &str) {
    let slot = match field {
        Field::PubDate => &mut entry.pub_date,
        Field::Updated => &mut entry.updated,
        Field::Severity => &mut entry.severity,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

/// Unescapes element text. Entities XML does not define, such as `&nbsp;`,
/// make quick-xml fail; those fall back to HTML entity decoding.
fn text_of<'a>(e: &'a BytesText<'a>) -> Cow<'a, str> {
    match e.unescape() {
        Ok(text) => text,
        Err(err) => {
            let raw = String::from_utf8_lossy(e);
            warn!(target: TARGET_WEB_REQUEST, "Decoding entry field {:?} as HTML: {}", raw, err);
            Cow::Owned(html_escape::decode_html_entities(&raw).into_owned())
        }
    }
}

/// Scans a feed document for the raw fields of every entry.
///
/// Only direct children of an entry are read; element names are matched on
/// their local part, so `cve:severity` counts as `severity`. The input must
/// be UTF-8.
pub fn scan_extensions(xml: &[u8]) -> Result<Vec<EntryExtensions>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<EntryExtensions> = None;
    // Element depth below the open entry.
    let mut depth = 0usize;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let local = e.local_name();
                if current.is_none() {
                    if is_entry(local.as_ref()) {
                        current = Some(EntryExtensions::default());
                        depth = 0;
                    }
                } else {
                    depth += 1;
                    field = if depth == 1 {
                        Field::from_name(local.as_ref())
                    } else {
                        None
                    };
                }
            }
            Event::Empty(e) => {
                // Keeps positions aligned with the parsed feed.
                if current.is_none() && is_entry(e.local_name().as_ref()) {
                    entries.push(EntryExtensions::default());
                }
            }
            Event::End(_) => {
                if current.is_some() {
                    if depth == 0 {
                        entries.extend(current.take());
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            field = None;
                        }
                    }
                }
            }
            Event::Text(e) => {
                if let (Some(entry), Some(field), 1) = (current.as_mut(), field, depth) {
                    let text = text_of(&e);
                    append(entry, field, text.trim());
                }
            }
            Event::CData(e) => {
                if let (Some(entry), Some(field), 1) = (current.as_mut(), field, depth) {
                    let text = String::from_utf8_lossy(&e);
                    append(entry, field, text.trim());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}
