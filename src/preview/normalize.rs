//! Markup stripping for anchor text
//!
//! Anchors store the raw selected source, while the projector searches the
//! rendered text where the renderer has already consumed the markup. This
//! strips the same syntax from the anchor so the two line up again.

use once_cell::sync::Lazy;
use regex::Regex;

static LIST_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d+[.)])[ \t]+").expect("Invalid LIST_PREFIX_RE regex")
});

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("Invalid HEADING_RE regex"));

static QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]?").expect("Invalid QUOTE_RE regex"));

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("Invalid LINK_RE regex"));

static TRAILING_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\n").expect("Invalid TRAILING_SPACE_RE regex"));

/// Strip markdown syntax the renderer does not keep in text content.
///
/// Underscores are only removed when they are not inside a word, so
/// `snake_case_name` survives while `_emphasis_` loses its markers.
pub fn normalize_anchor_text(text: &str) -> String {
    let text = QUOTE_RE.replace_all(text, "");
    let text = HEADING_RE.replace_all(&text, "");
    let text = LIST_PREFIX_RE.replace_all(&text, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = TRAILING_SPACE_RE.replace_all(&text, "\n");

    let text = text.replace("~~", "");
    let text: String = text.chars().filter(|&c| c != '`' && c != '*').collect();

    strip_underscores(&text)
}

fn strip_underscores(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '_' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let run_end = chars[i..]
            .iter()
            .position(|&c| c != '_')
            .map_or(chars.len(), |n| i + n);
        let inside_word = i > 0
            && chars[i - 1].is_alphanumeric()
            && chars.get(run_end).is_some_and(|c| c.is_alphanumeric());
        if inside_word {
            out.extend(&chars[i..run_end]);
        }
        i = run_end;
    }

    out
}
