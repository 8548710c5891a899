//! Email body normalization ahead of a size-bounded text analysis call
//!
//! The pipeline is `clean → truncate`, with paragraph chunking available as
//! a separate path for callers that prefer several bounded pieces over one
//! truncated piece. All lengths are counted in characters, not bytes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed characters-per-token approximation used for budgets
pub const CHARS_PER_TOKEN: usize = 4;

/// Default token budget for [`preprocess_email`]
pub const DEFAULT_MAX_TOKENS: usize = 5000;

/// Default chunk size, in characters, for [`split_email_content`]
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4000;

/// Appended to text cut by [`truncate_email_content`]
pub const TRUNCATION_MARKER: &str = "... [content truncated]";

/// Line prefixes that open a quoted reply/forward block
const QUOTE_MARKERS: [&str; 6] = [">", "On", "From:", "Sent:", "To:", "Subject:"];

const PARAGRAPH_BREAK: &str = "\n\n";

static BLANK_RUN_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

static HORIZONTAL_WS_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Sink for the informational notice emitted when text gets truncated.
///
/// Reporting cannot fail, so a reporter never changes the returned text.
/// Any `Fn(&str)` closure is a reporter.
pub trait TruncationReporter {
    fn report(&self, message: &str);
}

impl<F> TruncationReporter for F
where
    F: Fn(&str),
{
    fn report(&self, message: &str) {
        self(message);
    }
}

/// Reporter that forwards notices to `tracing` at warn level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TruncationReporter for TracingReporter {
    fn report(&self, message: &str) {
        warn!("{message}");
    }
}

/// Size limits for the preprocessing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    /// Token budget for [`preprocess_email`]
    pub max_tokens: usize,

    /// Character limit per chunk for [`split_email_content`]
    pub max_chunk_size: usize,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

impl PreprocessOptions {
    /// Load options from a JSON object; missing fields keep their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Character budget derived from the token budget
    #[must_use]
    pub const fn max_chars(&self) -> usize {
        self.max_tokens.saturating_mul(CHARS_PER_TOKEN)
    }
}

/// Drop quoted reply/forward blocks.
///
/// A line whose trimmed form starts with one of the quote markers opens a
/// block; every following line is dropped up to and including the next
/// blank line. A block that is never closed by a blank line swallows the
/// rest of the text.
#[must_use]
pub fn strip_quoted_sections(text: &str) -> String {
    let mut kept = Vec::new();
    let mut in_quoted_section = false;

    for line in text.split('\n') {
        let trimmed = line.trim();

        if QUOTE_MARKERS.iter().any(|marker| trimmed.starts_with(marker)) {
            in_quoted_section = true;
            continue;
        }

        if in_quoted_section {
            if trimmed.is_empty() {
                in_quoted_section = false;
            }
            continue;
        }

        kept.push(line);
    }

    kept.join("\n")
}

/// Collapse every run of blank lines into a single blank line
#[must_use]
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_REGEX.replace_all(text, PARAGRAPH_BREAK).into_owned()
}

/// Collapse every run of spaces and tabs into a single space
#[must_use]
pub fn collapse_horizontal_whitespace(text: &str) -> String {
    HORIZONTAL_WS_REGEX.replace_all(text, " ").into_owned()
}

/// Remove quoted sections and redundant whitespace
#[must_use]
pub fn clean_email_content(text: &str) -> String {
    let stripped = strip_quoted_sections(text);
    let collapsed = collapse_horizontal_whitespace(&collapse_blank_lines(&stripped));
    let cleaned = collapsed.trim().to_string();

    debug!(
        "Cleaned email: {} -> {} characters",
        text.chars().count(),
        cleaned.chars().count()
    );

    cleaned
}

/// Cut text down to `max_tokens * CHARS_PER_TOKEN` characters.
///
/// Text within budget is returned unchanged. Otherwise the kept prefix is
/// followed by [`TRUNCATION_MARKER`] and `reporter` is told the length
/// before and after.
#[must_use]
pub fn truncate_email_content(
    text: &str,
    max_tokens: usize,
    reporter: &dyn TruncationReporter,
) -> String {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    let length = text.chars().count();

    if length <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(idx, _)| idx);

    let mut truncated = String::with_capacity(cut + TRUNCATION_MARKER.len());
    truncated.push_str(&text[..cut]);
    truncated.push_str(TRUNCATION_MARKER);

    reporter.report(&format!(
        "Email was truncated from {length} to {max_chars} characters for processing."
    ));

    truncated
}

/// Clean then truncate; the entry point for downstream analysis code
#[must_use]
pub fn preprocess_email(
    text: &str,
    max_tokens: usize,
    reporter: &dyn TruncationReporter,
) -> String {
    let cleaned = clean_email_content(text);
    truncate_email_content(&cleaned, max_tokens, reporter)
}

/// Greedily pack paragraphs into chunks of fewer than `max_chunk_size`
/// characters.
///
/// A paragraph joins the current chunk only while the accumulated length
/// (separators included) plus the paragraph length stays strictly below
/// the limit. A paragraph that alone exceeds the limit still becomes its
/// own chunk. Chunks are trimmed.
#[must_use]
pub fn split_email_content(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in text.split(PARAGRAPH_BREAK) {
        let paragraph_len = paragraph.chars().count();

        if current_len + paragraph_len < max_chunk_size {
            current.push_str(paragraph);
            current.push_str(PARAGRAPH_BREAK);
            current_len += paragraph_len + PARAGRAPH_BREAK.len();
        } else {
            if !current.is_empty() {
                chunks.push(current.trim().to_string());
            }
            current = format!("{paragraph}{PARAGRAPH_BREAK}");
            current_len = paragraph_len + PARAGRAPH_BREAK.len();
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    debug!("Split email into {} chunks", chunks.len());

    chunks
}

/// Options plus a reporter, for callers that configure the pipeline once
#[derive(Debug, Clone, Default)]
pub struct Preprocessor<R = TracingReporter> {
    options: PreprocessOptions,
    reporter: R,
}

impl Preprocessor {
    #[must_use]
    pub const fn new(options: PreprocessOptions) -> Self {
        Self {
            options,
            reporter: TracingReporter,
        }
    }
}

impl<R: TruncationReporter> Preprocessor<R> {
    #[must_use]
    pub const fn with_reporter(options: PreprocessOptions, reporter: R) -> Self {
        Self { options, reporter }
    }

    #[must_use]
    pub const fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Clean and truncate to the configured token budget
    #[must_use]
    pub fn preprocess(&self, text: &str) -> String {
        preprocess_email(text, self.options.max_tokens, &self.reporter)
    }

    /// Clean, then split into chunks of the configured size
    #[must_use]
    pub fn chunks(&self, text: &str) -> Vec<String> {
        split_email_content(&clean_email_content(text), self.options.max_chunk_size)
    }
}
