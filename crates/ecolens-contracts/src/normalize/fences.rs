pub const FENCE: &str = "```";
pub const LANGUAGE_TAG: &str = "html";

/// Removes every opening fence: "```", an optional `html` tag, optional
/// spaces or tabs, then a newline. A fence not followed by a newline is kept.
pub fn strip_leading_fence(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(FENCE) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + FENCE.len()..];
        match opening_fence_tail_len(after) {
            Some(consumed) => rest = &after[consumed..],
            None => {
                out.push_str(FENCE);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn opening_fence_tail_len(after: &str) -> Option<usize> {
    let tagged = after.strip_prefix(LANGUAGE_TAG).unwrap_or(after);
    let padded = tagged.trim_start_matches([' ', '\t']);
    let padded = padded.strip_prefix('\r').unwrap_or(padded);
    let remainder = padded.strip_prefix('\n')?;
    Some(after.len() - remainder.len())
}

/// Removes a fence that is followed only by whitespace up to the end.
pub fn strip_trailing_fence(text: &str) -> String {
    match text.trim_end().strip_suffix(FENCE) {
        Some(head) => head.to_string(),
        None => text.to_string(),
    }
}

/// Removes exactly one fence from each end of the trimmed text when both are present.
pub fn strip_whole_wrap(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix(FENCE)
        .and_then(|rest| rest.strip_suffix(FENCE))
    {
        Some(inner) => inner.to_string(),
        None => text.to_string(),
    }
}

/// Leading strip, then trailing strip, then whole-wrap strip, then trim.
pub fn strip_fences(text: &str) -> String {
    let stripped = strip_leading_fence(text);
    let stripped = strip_trailing_fence(&stripped);
    let stripped = strip_whole_wrap(&stripped);
    stripped.trim().to_string()
}
