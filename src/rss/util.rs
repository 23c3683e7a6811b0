//! Utility functions for RSS feed processing.

use encoding_rs::Encoding;
use std::borrow::Cow;

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

/// Clean up malformed XML
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim();

    // Remove any UTF-8 BOM if present
    if let Some(stripped) = cleaned.strip_prefix('\u{FEFF}') {
        cleaned = stripped;
    }

    // Remove anything before <?xml, <rss, <rdf:RDF or <feed
    if let Some(start) = ["<?xml", "<rss", "<rdf:RDF", "<feed"]
        .iter()
        .find_map(|marker| cleaned.find(marker))
    {
        cleaned = &cleaned[start..];
    }

    // Replace common HTML-only entities that XML parsers reject
    let mut cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&apos;", "&#39;");

    // Remove any invalid XML characters
    cleaned = cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | // tab
                '\u{000A}' | // newline
                '\u{000D}' | // carriage return
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect();

    cleaned
}

/// Returns `body` as UTF-8 bytes. Bodies that are not valid UTF-8 are
/// decoded with the charset named in the XML declaration, or windows-1252
/// when none is declared or the label is unknown.
pub(crate) fn to_utf8(body: &[u8]) -> Cow<'_, [u8]> {
    if std::str::from_utf8(body).is_ok() {
        return Cow::Borrowed(body);
    }
    let encoding = declared_encoding(body).unwrap_or(encoding_rs::WINDOWS_1252);
    let (decoded, _, _) = encoding.decode(body);
    Cow::Owned(decoded.into_owned().into_bytes())
}

/// Reads the `encoding` pseudo-attribute of a leading `<?xml ... ?>`.
fn declared_encoding(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(256)]);
    let decl = &head[head.find("<?xml")?..];
    let decl = &decl[..decl.find("?>")?];
    let value = &decl[decl.find("encoding")? + "encoding".len()..];
    let value = value.trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let label = value[1..].split(quote).next()?;
    Encoding::for_label(label.trim().as_bytes())
}

/// Returns true if the text looks like an RSS, RDF or Atom document.
pub(crate) fn looks_like_feed(xml: &str) -> bool {
    xml.contains("<rss") || xml.contains("<rdf:RDF") || xml.contains("<feed")
}
