//! Field normalization helpers shared by every source adapter.
//!
//! The listing pages this application watches disagree on everything:
//! whether the clock time lives inside the headline or in a sibling node,
//! how much whitespace padding the markup leaks into text, and whether
//! links are absolute, relative, or protocol-relative. This module is the
//! single place those inconsistencies are reconciled:
//!
//! - Whitespace collapsing and display truncation
//! - `HH:MM` clock-token extraction and removal
//! - Relative/protocol-relative URL resolution with scheme validation
//!
//! Every function here is pure and deterministic — no network, no clock,
//! no global state — so the whole module is unit-testable in isolation.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Matches an `H:MM` or `HH:MM` shaped token. Hour range is validated in
/// code, not in the pattern, so `extract_clock_time` can skip over invalid
/// matches like `47:30` and keep searching.
static CLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());

/// Strips spacing around separator punctuation left behind once clock
/// tokens are removed (`"08:12 ｜ headline"` leaves `" ｜ headline"`).
static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*([，、,:;｜|\-–—/])\s*").unwrap());

/// Punctuation that should never begin or end a cleaned headline. Includes
/// the full-width forms the Taiwanese sources use.
const BOUNDARY_PUNCT: &[char] = &[
    ' ', '.', '。', '、', '，', ',', ':', ';', '|', '｜', '-', '–', '—', '/',
];

fn is_separator(c: char) -> bool {
    matches!(
        c,
        '，' | '、' | ',' | ':' | ';' | '｜' | '|' | '-' | '–' | '—' | '/'
    )
}

/// Collapse every whitespace run (including full-width spaces) to a single
/// space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a display string to `max_len` characters.
///
/// Strings within the bound are returned unchanged (modulo whitespace
/// collapsing); longer strings keep their first `max_len - 1` characters
/// and gain a `…` marker. Counting is by `char` so multi-byte headlines
/// are never split mid-character.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(shorten("short", 40), "short");
/// assert_eq!(shorten("abcdef", 4), "abc…");
/// ```
pub fn shorten(text: &str, max_len: usize) -> String {
    let text = collapse_whitespace(text);
    if text.chars().count() <= max_len {
        return text;
    }
    let mut out: String = text.chars().take(max_len.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Extract the first valid clock time from a piece of text.
///
/// Scans for `H:MM` / `HH:MM` tokens and returns the first one whose hour
/// is in `0..=23`, zero-padded to `HH:MM`. Tokens with out-of-range hours
/// (`24:10`, `99:99`) are skipped, not treated as errors.
///
/// # Returns
///
/// `Some("HH:MM")` for the first valid token, `None` if the text carries
/// no recoverable clock time.
pub fn extract_clock_time(text: &str) -> Option<String> {
    for caps in CLOCK_RE.captures_iter(text) {
        let hour: u32 = caps[1].parse().ok()?;
        if hour <= 23 {
            return Some(format!("{:02}:{}", hour, &caps[2]));
        }
    }
    None
}

/// Remove every `HH:MM`-shaped token from a headline and clean up the
/// artifacts the removal leaves behind.
///
/// The listing pages embed publication times at arbitrary positions in the
/// anchor text — sometimes leading, sometimes trailing, sometimes both.
/// Removal happens in three passes:
///
/// 1. Delete all clock-shaped tokens (regardless of hour validity — a
///    nonsense `47:30` is still display noise).
/// 2. Collapse whitespace and tighten spacing around separator punctuation,
///    then squeeze runs of separators down to one.
/// 3. Trim leftover boundary punctuation from both ends.
pub fn strip_clock_tokens(text: &str) -> String {
    let stripped = CLOCK_RE.replace_all(text, "");
    let collapsed = collapse_whitespace(&stripped);
    let tightened = SEPARATOR_RE.replace_all(&collapsed, "$1");

    // Squeeze "，，" / ",-" style runs left where two tokens were removed.
    let mut squeezed = String::with_capacity(tightened.len());
    let mut prev_sep = false;
    for c in tightened.chars() {
        let sep = is_separator(c);
        if sep && prev_sep {
            continue;
        }
        prev_sep = sep;
        squeezed.push(c);
    }

    squeezed
        .trim_matches(|c: char| BOUNDARY_PUNCT.contains(&c))
        .to_string()
}

/// Resolve a candidate link or image reference to an absolute URL.
///
/// Protocol-relative references (`//host/path`) become `https:`; relative
/// paths are joined against `base`. The result is rejected unless its
/// scheme is exactly `http` or `https` — `javascript:`, `data:`, `mailto:`
/// and friends all yield `None` so a malformed candidate is dropped rather
/// than delivered.
pub fn resolve_url(candidate: &str, base: &Url) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let resolved = if let Some(rest) = candidate.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()?
    } else if candidate.starts_with("http://") || candidate.starts_with("https://") {
        Url::parse(candidate).ok()?
    } else {
        base.join(candidate).ok()?
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.into()),
        _ => None,
    }
}
