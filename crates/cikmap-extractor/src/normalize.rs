//! Text normalization applied before scanning
//!
//! Filings arrive as SGML-wrapped plain text or HTML. Identifiers are often
//! typeset with separators (`80004C-10-1`, `518439 10 4`), wrapped in
//! parentheses or glued to a form label, so the text is rewritten into a
//! shape the scanner can match with a single pattern.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static HEADER_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</SEC-HEADER>").unwrap());

static DOCUMENT_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<DOCUMENT>").unwrap());

static NBSP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&nbsp;|&#160;|&#xa0;|\x{a0}").unwrap());

// 80004C-10-1, 518439 10 4
static SPLIT_6_2_1_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Z0-9]{6})[ \t\-]+(\d{1,2})[ \t\-]+(\d)\b").unwrap()
});

// 461148-AA6
static SPLIT_6_3_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([A-Z0-9]{6})[ \t\-]+([A-Z0-9]{2,3})\b").unwrap());

// 922-57T-202, 563 118 108
static SPLIT_3_3_3_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Z0-9]{3})[ \t\-]+([A-Z0-9]{3})[ \t\-]+([A-Z0-9]{3})\b").unwrap()
});

static PARENTHESIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Za-z0-9]{8,10})\)").unwrap());

// 82257T20213G/A -> 82257T202 13G/A
static FORM_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z0-9]{9})(\d{1,2}[A-Z](?:/[A-Z])?)\b").unwrap());

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&(?:[a-z]+|#\d+|#x[0-9a-f]+);").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Minimum digits a joined token needs before separators are removed
const MIN_JOINED_DIGITS: usize = 5;

/// Drop the SEC header, returning the document body
///
/// The body starts after the first `</SEC-HEADER>`, else after the first
/// `<DOCUMENT>`. Text with neither is returned whole.
pub fn skip_header(text: &str) -> &str {
    if let Some(m) = HEADER_END_RE.find(text) {
        return &text[m.end()..];
    }
    if let Some(m) = DOCUMENT_START_RE.find(text) {
        return &text[m.end()..];
    }
    text
}

/// Rewrite filing text so identifiers appear as contiguous tokens
pub fn normalize(text: &str) -> String {
    let text = NBSP_RE.replace_all(text, " ");
    let text = join_groups(&SPLIT_6_2_1_RE, text);
    let text = join_groups(&SPLIT_6_3_RE, text);
    let text = join_groups(&SPLIT_3_3_3_RE, text);
    let text = PARENTHESIZED_RE.replace_all(&text, "$1").into_owned();
    let text = FORM_SUFFIX_RE.replace_all(&text, "$1 $2").into_owned();
    let text = ENTITY_RE.replace_all(&text, " ").into_owned();
    TAG_RE.replace_all(&text, " ").into_owned()
}

fn join_groups<'a>(re: &Regex, text: Cow<'a, str>) -> Cow<'a, str> {
    if !re.is_match(&text) {
        return text;
    }
    let joined = re.replace_all(&text, |caps: &Captures| {
        let joined: String = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .collect();
        if joined.bytes().filter(u8::is_ascii_digit).count() >= MIN_JOINED_DIGITS {
            joined
        } else {
            caps[0].to_string()
        }
    });
    Cow::Owned(joined.into_owned())
}
