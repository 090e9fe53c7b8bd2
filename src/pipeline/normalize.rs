//! Plain-text rendering: strip Markdown syntax from converter output.
//!
//! Downstream consumers (search indexes, embedding pipelines, previews) want
//! the words without the markup. This is not a Markdown parser: it applies
//! seven regex rules, in a fixed order, each over the output of the previous
//! one, then trims. Clients compare outputs across deployments, so the rules
//! and their order are part of the contract.
//!
//! ## Rule Order
//!
//! Links are rewritten before images, so `![alt](src)` with a non-empty alt
//! first becomes `!alt` and is not removed by the image rule. Only images with
//! an empty alt text disappear entirely. Code fences are removed after the
//! emphasis and link rules have already run over their contents.

use once_cell::sync::Lazy;
use regex::Regex;

/// Convert Markdown to plain text.
///
/// Rules (applied in order):
/// 1. Strip ATX heading markers (`#`–`######` plus following whitespace)
/// 2. Unwrap `*`/`_` emphasis runs of one or two markers
/// 3. Replace `[text](url)` links with `text`
/// 4. Remove `![](url)` images
/// 5. Remove fenced code blocks
/// 6. Unwrap inline code spans
/// 7. Collapse 3+ consecutive newlines to 2
/// 8. Trim surrounding whitespace
pub fn to_plain_text(markdown: &str) -> String {
    let s = strip_headings(markdown);
    let s = strip_emphasis(&s);
    let s = replace_links(&s);
    let s = remove_images(&s);
    let s = remove_code_blocks(&s);
    let s = unwrap_inline_code(&s);
    let s = collapse_newlines(&s);
    s.trim().to_string()
}

// ── Rule 1: Headings ─────────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());

fn strip_headings(input: &str) -> String {
    RE_HEADING.replace_all(input, "").into_owned()
}

// ── Rule 2: Bold / italic ────────────────────────────────────────────────────

static RE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_]{1,2}([^*_]+)[*_]{1,2}").unwrap());

fn strip_emphasis(input: &str) -> String {
    RE_EMPHASIS.replace_all(input, "${1}").into_owned()
}

// ── Rule 3: Links ────────────────────────────────────────────────────────────

static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());

fn replace_links(input: &str) -> String {
    RE_LINK.replace_all(input, "${1}").into_owned()
}

// ── Rule 4: Images ───────────────────────────────────────────────────────────

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]+\)").unwrap());

fn remove_images(input: &str) -> String {
    RE_IMAGE.replace_all(input, "").into_owned()
}

// ── Rule 5: Fenced code blocks ───────────────────────────────────────────────

static RE_CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```[^`]*```").unwrap());

fn remove_code_blocks(input: &str) -> String {
    RE_CODE_BLOCK.replace_all(input, "").into_owned()
}

// ── Rule 6: Inline code ──────────────────────────────────────────────────────

static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());

fn unwrap_inline_code(input: &str) -> String {
    RE_INLINE_CODE.replace_all(input, "${1}").into_owned()
}

// ── Rule 7: Blank lines ──────────────────────────────────────────────────────

static RE_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_newlines(input: &str) -> String {
    RE_NEWLINES.replace_all(input, "\n\n").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
