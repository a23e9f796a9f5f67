//! Text normalization: deterministic cleanup of extracted page text.
//!
//! PDF text layers break numbers across lines (`1,250,\n000`), hyphenate
//! words at line ends, and sometimes emit letter-spaced headings
//! (`R E V E N U E`). The verifier compares figures literally, so page text
//! and claims are both normalized before they reach it.
//!
//! ## Rule order
//!
//! Line endings are normalized first so the newline rules see only `\n`.
//! Numbers are rejoined before newlines are collapsed, otherwise the digits
//! would end up separated by a space and no longer look split.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every normalization rule, in order.
///
/// 1. Normalize line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Rejoin thousands groups split after a comma: `1,\n250` → `1,250`
/// 4. Rejoin digit runs split by a line break: `12\n50` → `1250`
/// 5. Rejoin words hyphenated across a line break: `manu-\nfacturing`
/// 6. Collapse every line break (and surrounding spaces) into one space
/// 7. Join letter-spaced words: `R E V E N U E` → `REVENUE`
/// 8. Trim
pub fn normalize_text(input: &str) -> String {
    let s = normalize_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = join_split_thousands(&s);
    let s = join_split_digits(&s);
    let s = join_hyphenated_words(&s);
    let s = collapse_line_breaks(&s);
    let s = join_spaced_letters(&s);
    s.trim().to_string()
}

// ── Rule 1: Line endings ─────────────────────────────────────────────────

fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Invisible Unicode ────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Thousands groups split after a comma ─────────────────────────

static RE_SPLIT_THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d),[ \t]*\n[ \t]*(\d)").unwrap());

fn join_split_thousands(input: &str) -> String {
    RE_SPLIT_THOUSANDS.replace_all(input, "$1,$2").into_owned()
}

// ── Rule 4: Digit runs split by a line break ─────────────────────────────

static RE_SPLIT_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)[ \t]*\n[ \t]*(\d)").unwrap());

fn join_split_digits(input: &str) -> String {
    RE_SPLIT_DIGITS.replace_all(input, "$1$2").into_owned()
}

// ── Rule 5: Hyphenated line breaks ───────────────────────────────────────
//
// Only lowercase on both sides: `Asia-\nPacific` and `2023-\n2024` keep
// their hyphen (the newline rule then turns them into `Asia- Pacific`).

static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])-[ \t]*\n[ \t]*([a-z])").unwrap());

fn join_hyphenated_words(input: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(input, "$1$2").into_owned()
}

// ── Rule 6: Collapse line breaks ─────────────────────────────────────────

static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());

fn collapse_line_breaks(input: &str) -> String {
    RE_LINE_BREAK.replace_all(input, " ").into_owned()
}

// ── Rule 7: Letter-spaced words ──────────────────────────────────────────
//
// A run of at least four single letters separated by single spaces.
// Shorter runs are left alone so "a b c" style lists survive. Digits never
// match: table rows like `5 4 3 2` are separate figures.

static RE_SPACED_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\p{L}(?: \p{L}){3,}\b").unwrap());

fn join_spaced_letters(input: &str) -> String {
    RE_SPACED_LETTERS
        .replace_all(input, |caps: &regex::Captures<'_>| caps[0].replace(' ', ""))
        .into_owned()
}
