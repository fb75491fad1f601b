//! Post-processing: deterministic cleanup of raw oracle replies.
//!
//! Models asked for "a single JSON object" still wrap it in ```` ```json ````
//! fences now and then, prepend a BOM, or use CRLF line endings. Two passes
//! run around the JSON decode in [`crate::pipeline::oracle`]:
//!
//! 1. [`clean_reply`] on the raw reply, before parsing
//! 2. [`clean_content`] on the decoded `translatedContent`
//!
//! Neither pass touches words, numbers or layout. The populated text keeps
//! its spaces and blank lines exactly as the model produced them; only line
//! endings and invisible characters are normalised.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prepare a raw reply for JSON decoding.
pub fn clean_reply(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = strip_code_fences(&s);
    s.trim().to_string()
}

/// Normalise the populated text taken out of the reply.
pub fn clean_content(input: &str) -> String {
    let s = normalise_line_endings(input);
    remove_invisible_chars(&s)
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
