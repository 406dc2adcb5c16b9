//! Whitespace cleanup for extracted text
//!
//! PDF extractors emit hard line breaks mid-sentence and inconsistent
//! spacing. The stored text joins lines within a paragraph with single
//! spaces and keeps paragraph breaks as blank lines, which reads cleanly
//! in content views and leaves the token sequence unchanged.

/// Normalize raw extractor output into stored book text.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_break = false;

    for line in raw.lines() {
        let mut cleaned = String::with_capacity(line.len());
        for token in line.split_whitespace() {
            if !cleaned.is_empty() {
                cleaned.push(' ');
            }
            cleaned.push_str(token);
        }

        if cleaned.is_empty() {
            pending_break = !out.is_empty();
            continue;
        }

        if !out.is_empty() {
            out.push_str(if pending_break { "\n\n" } else { " " });
        }
        pending_break = false;
        out.push_str(&cleaned);
    }

    out
}
