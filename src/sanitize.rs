//! Plain-text extraction for HTML-bearing feed fields.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Decodes HTML entities, then removes every `<...>` span.
///
/// Repeats until the text stops changing, so entity-escaped markup such as
/// `&amp;lt;b&amp;gt;` is stripped too and `sanitize(sanitize(x)) == sanitize(x)`.
/// Block-level tags are dropped without inserting whitespace.
pub fn sanitize(raw: &str) -> String {
    let mut current = raw.to_string();
    // Every pass that changes the text removes characters, so this ends.
    loop {
        let decoded = html_escape::decode_html_entities(&current);
        let stripped = TAG_RE.replace_all(&decoded, "").into_owned();
        if stripped == current {
            break;
        }
        current = stripped;
    }
    current.trim().to_string()
}
