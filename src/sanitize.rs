//! Repairs for the malformed XML BGG sometimes serves.
//!
//! Free-text fields (descriptions, forum posts, names) regularly contain bare
//! `&`, HTML-only entities like `&copy;` and stray C0 control characters, any
//! of which makes a strict XML parser give up on the whole document.

use quick_xml::escape::{escape, resolve_html5_entity};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

fn cdata_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>").expect("valid CDATA pattern"))
}

fn ampersand_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(?:(amp|lt|gt|apos|quot|#[0-9]+|#x[0-9a-fA-F]+);|([a-zA-Z]+);)?")
            .expect("valid entity pattern")
    })
}

/// Make a response body acceptable to a strict XML parser.
///
/// CDATA sections and valid XML entity references (`&amp;`, `&lt;`, `&gt;`,
/// `&apos;`, `&quot;`, `&#NNN;`, `&#xHHHH;`) pass through byte for byte.
/// Named HTML entities are replaced by the characters they stand for, every
/// other `&` becomes `&amp;`, and control characters other than tab, line feed
/// and carriage return are removed.
pub fn sanitize_xml(body: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(body);
    let mut repaired = String::with_capacity(text.len());

    let mut cursor = 0;
    for cdata in cdata_regex().find_iter(&text) {
        repaired.push_str(&escape_ampersands(&text[cursor..cdata.start()]));
        repaired.push_str(cdata.as_str());
        cursor = cdata.end();
    }
    repaired.push_str(&escape_ampersands(&text[cursor..]));

    strip_control_chars(&repaired).into_bytes()
}

fn escape_ampersands(segment: &str) -> Cow<'_, str> {
    ampersand_regex().replace_all(segment, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            return caps[0].to_string();
        }
        match caps.get(2) {
            Some(name) => match resolve_html5_entity(name.as_str()) {
                Some(resolved) => escape(resolved).into_owned(),
                None => format!("&amp;{};", name.as_str()),
            },
            None => "&amp;".to_string(),
        }
    })
}

fn is_illegal_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}')
}

fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !is_illegal_control(*c)).collect()
}
