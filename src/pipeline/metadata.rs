//! Metadata derivation: cheap statistics over the converted text.
//!
//! Page count and format are guesses. The converter does not say what the
//! source document was, so [`detect_format`] looks for tell-tale Markdown
//! (table pipes, slide separators, link syntax) and [`estimate_pages`] divides
//! by a fixed page size. Both thresholds are kept stable so clients that
//! already branch on `detected_format` keep working.

use crate::output::{DetectedFormat, DocumentMetadata};
use crate::upload::UploadRequest;

/// Characters of plain text assumed to fill one page.
pub const CHARS_PER_PAGE: usize = 2000;

/// A document with more than this many `|` characters is treated as tabular.
pub const SPREADSHEET_PIPE_THRESHOLD: usize = 10;

/// Compute metadata for one converted upload.
///
/// `characters` and `words` count the Markdown; `estimated_pages` counts the
/// plain text.
pub fn derive(markdown: &str, plain_text: &str, upload: &UploadRequest) -> DocumentMetadata {
    DocumentMetadata {
        file_name: upload.file_name.clone(),
        file_size_bytes: upload.size(),
        file_type: upload.content_type.clone(),
        characters: markdown.chars().count(),
        words: count_words(markdown),
        estimated_pages: estimate_pages(plain_text),
        detected_format: detect_format(markdown),
    }
}

/// Number of whitespace-separated tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// `max(1, chars / 2000)`, rounding down.
pub fn estimate_pages(plain_text: &str) -> usize {
    (plain_text.chars().count() / CHARS_PER_PAGE).max(1)
}

/// Guess the source format from Markdown patterns. First match wins:
/// many pipes → spreadsheet, `---` → presentation, link syntax → html,
/// otherwise document.
pub fn detect_format(markdown: &str) -> DetectedFormat {
    if markdown.matches('|').count() > SPREADSHEET_PIPE_THRESHOLD {
        DetectedFormat::Spreadsheet
    } else if markdown.contains("---") {
        DetectedFormat::Presentation
    } else if markdown.contains('[') && markdown.contains("](") {
        DetectedFormat::Html
    } else {
        DetectedFormat::Document
    }
}
