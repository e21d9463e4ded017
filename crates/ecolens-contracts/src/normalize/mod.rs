//! Turns an analysis response into ordered [`ContentBlock`]s.
//!
//! Precedence is fixed: a transport failure wins over any payload, an
//! application error wins over content, fence stripping runs before the markup
//! sniff, and only unsniffed text is split into lines.
//!
//! The markup sniff is a substring test, so plain text such as
//! `<https://example.com>` is classified as markup. Markup is passed through as
//! [`ContentBlock::RawMarkup`] and rendered without escaping; upstream content is
//! trusted at that point.

mod fences;
mod lines;

pub use fences::{
    strip_fences, strip_leading_fence, strip_trailing_fence, strip_whole_wrap, FENCE,
};
pub use lines::{classify_line, classify_lines, BOLD_MARKER, BULLET_MARKER};

use crate::content::{ContentBlock, ErrorKind, NormalizedResult, TransportError};
use crate::wire::{AnalysisPayload, UNKNOWN_ERROR_MESSAGE};

pub const MARKUP_HINTS: &[&str] = &["<h", "<p", "<ul"];

pub fn is_markup(text: &str) -> bool {
    MARKUP_HINTS.iter().any(|hint| text.contains(hint))
}

pub fn normalize(
    payload: Option<&AnalysisPayload>,
    transport_error: Option<&TransportError>,
) -> NormalizedResult {
    if let Some(err) = transport_error {
        return NormalizedResult::failure(err.kind, err.message.clone());
    }
    match payload {
        Some(AnalysisPayload::Content(content)) => {
            NormalizedResult::success(normalize_content(content))
        }
        Some(AnalysisPayload::Error(message)) if !message.trim().is_empty() => {
            NormalizedResult::failure(ErrorKind::ApplicationError, message.clone())
        }
        _ => NormalizedResult::failure(ErrorKind::ApplicationError, UNKNOWN_ERROR_MESSAGE),
    }
}

pub fn normalize_content(content: &str) -> Vec<ContentBlock> {
    let cleaned = strip_fences(content);
    if cleaned.is_empty() {
        return Vec::new();
    }
    if is_markup(&cleaned) {
        return vec![ContentBlock::RawMarkup(cleaned)];
    }
    classify_lines(&cleaned)
}
