use crate::content::ContentBlock;

pub const BOLD_MARKER: &str = "**";
pub const BULLET_MARKER: &str = "* ";

/// Classifies one line of the plain-text convention. Blank lines yield `None`.
pub fn classify_line(line: &str) -> Option<ContentBlock> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() > BOLD_MARKER.len()
        && trimmed.starts_with(BOLD_MARKER)
        && trimmed.ends_with(BOLD_MARKER)
    {
        // "***" overlaps both markers and leaves nothing between them.
        let inner = trimmed
            .get(BOLD_MARKER.len()..trimmed.len() - BOLD_MARKER.len())
            .unwrap_or_default();
        return Some(ContentBlock::Heading(inner.to_string()));
    }
    if let Some(item) = trimmed.strip_prefix(BULLET_MARKER) {
        return Some(ContentBlock::ListItem(item.to_string()));
    }
    Some(ContentBlock::Paragraph(trimmed.to_string()))
}

pub fn classify_lines(text: &str) -> Vec<ContentBlock> {
    text.split('\n').filter_map(classify_line).collect()
}
