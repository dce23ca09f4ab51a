//! Helpers for sanitizing data before it enters logs and span attributes.
//!
//! Storage keys and client file names can carry directory structure or
//! personal names; spans only ever get the final path component.

/// Returns only the last `/`-separated component of a storage key or file
/// name.
///
/// - `cards/3f2a/9c1d.png` → `9c1d.png`
/// - `C:\scans\front.jpg` → `front.jpg`
pub fn redact_key(key: &str) -> String {
    key.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Cuts `text` down to at most `max_chars` characters, marking the cut.
///
/// Used for upstream error bodies and model output so a misbehaving
/// service can't flood the logs.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... (truncated)", &text[..cut]),
        None => text.to_string(),
    }
}
