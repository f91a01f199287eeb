//! Pattern-based extraction of tag-pinned action references.
//!
//! Grammar, per match:
//!
//! ```text
//! uses:<blank>+[<q>]<owner>/<repo>[/<subpath>...]@v<digits>[.<digits>]*[<q>]
//! ```
//!
//! `<q>` is an optional `"` or `'`; when the reference opens with one it must
//! close with the same one, and the closing quote is part of the literal.
//! Unquoted, the tag must end at a token boundary, so `v1.2.3-beta` and
//! `v1.2.` are left alone. Local actions (`uses: ./path`) and references already pinned
//! to a commit (`@<sha> # v1`) never match.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ActionReference {
    /// `owner/repo`, sub-path stripped.
    pub identity: String,
    /// e.g. `v1.2.3`
    pub tag: String,
    /// Exact text matched in the source, e.g. `uses: owner/repo/sub@v1.2.3`.
    pub literal_text: String,
}

static USES_RE: OnceLock<Regex> = OnceLock::new();

fn uses_re() -> &'static Regex {
    USES_RE.get_or_init(|| {
        Regex::new(
            r#"uses:[ \t]+(["']?)([A-Za-z0-9][A-Za-z0-9_.\-]*/[A-Za-z0-9_.\-]+)(?:/[A-Za-z0-9_.\-]+)*@(v[0-9]+(?:\.[0-9]+)*)"#,
        )
        .unwrap()
    })
}

/// Characters that would continue a tag token past the matched version.
fn continues_tag(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+' | '/' | '@')
}

fn matches(text: &str) -> impl Iterator<Item = (Range<usize>, ActionReference)> + '_ {
    uses_re().captures_iter(text).filter_map(move |caps| {
        let whole = caps.get(0)?;
        let quote = caps.get(1).map_or("", |m| m.as_str());
        let rest = &text[whole.end()..];
        let end = if quote.is_empty() {
            if rest.chars().next().is_some_and(continues_tag) {
                return None;
            }
            whole.end()
        } else if rest.starts_with(quote) {
            whole.end() + quote.len()
        } else {
            return None;
        };
        let reference = ActionReference {
            identity: caps.get(2)?.as_str().to_string(),
            tag: caps.get(3)?.as_str().to_string(),
            literal_text: text[whole.start()..end].to_string(),
        };
        Some((whole.start()..end, reference))
    })
}

/// Every action reference in `text`, in order of appearance.
///
/// Duplicates are kept. Returns an empty vector when nothing matches.
pub fn extract(text: &str) -> Vec<ActionReference> {
    matches(text).map(|(_, reference)| reference).collect()
}

/// Rewrite every reference whose literal text is a key of `table`.
///
/// Keyed by literal text, not position: identical references are rewritten
/// identically. References absent from `table` are copied through.
pub fn substitute(text: &str, table: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(text.len() + table.len() * 48);
    let mut cursor = 0;
    for (range, reference) in matches(text) {
        if let Some(replacement) = table.get(reference.literal_text.as_str()) {
            out.push_str(&text[cursor..range.start]);
            out.push_str(replacement);
            cursor = range.end;
        }
    }
    out.push_str(&text[cursor..]);
    out
}
