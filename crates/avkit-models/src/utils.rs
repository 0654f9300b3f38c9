//! Filename helpers and formatting utilities.

use uuid::Uuid;

use crate::encoding::OUTPUT_EXTENSION;

/// Reduce an untrusted file name to a safe, flat name.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`. Whitespace runs become a
/// single `_`, everything else (path separators included) is dropped, and
/// dots/underscores are trimmed from both ends so the result can never be
/// hidden or relative. Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Eight random lowercase hex characters.
pub fn short_token() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..8].to_string()
}

/// Stem of a file name: everything before the last dot.
fn stem_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Build a collision-free `.mp4` output name.
///
/// The requested name is sanitized first; when it is missing or sanitizes to
/// nothing, `fallback` is used instead. The result is
/// `<stem>_<8 hex chars>.mp4`.
pub fn unique_output_name(requested: Option<&str>, fallback: &str) -> String {
    let base = requested
        .and_then(sanitize_filename)
        .or_else(|| sanitize_filename(fallback))
        .unwrap_or_else(|| "output".to_string());

    format!("{}_{}.{}", stem_of(&base), short_token(), OUTPUT_EXTENSION)
}

/// Storage name of an uploaded file: `<8 hex chars>_<sanitized name>`.
///
/// Returns `None` when the original name sanitizes to nothing.
pub fn unique_upload_name(original: &str) -> Option<String> {
    sanitize_filename(original).map(|name| format!("{}_{}", short_token(), name))
}

/// Format bytes to human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
