pub const MAX_FILENAME_BYTES: usize = 255;
pub const MARKDOWN_EXTENSION: &str = "md";

const WINDOWS_RESERVED: &[&str] = &["con", "prn", "aux", "nul"];
const WINDOWS_NUMBERED: &[&str] = &["com", "lpt"];

/// Derive a file name that is legal on common filesystems.
///
/// Illegal and control characters are removed (not replaced), dot-only and
/// reserved device names collapse to an empty string, trailing dots and
/// spaces are stripped and the result is capped at 255 bytes.
pub fn sanitize_filename(value: &str) -> String {
    sanitize_filename_within(value, MAX_FILENAME_BYTES)
}

/// Stem for `<stem>.md`, leaving room for the extension in the 255 byte limit.
pub fn markdown_stem(title: &str) -> String {
    sanitize_filename_within(title, MAX_FILENAME_BYTES - MARKDOWN_EXTENSION.len() - 1)
}

pub fn sanitize_filename_within(value: &str, max_bytes: usize) -> String {
    let mut output: String = value
        .chars()
        .filter(|ch| !is_illegal_char(*ch) && !is_control_char(*ch))
        .collect();

    if !output.is_empty() && output.chars().all(|ch| ch == '.') {
        output.clear();
    }
    if is_windows_reserved(&output) {
        output.clear();
    }
    trim_trailing_dots_and_spaces(&mut output);
    truncate_to_boundary(&mut output, max_bytes);
    trim_trailing_dots_and_spaces(&mut output);
    output
}

pub fn is_filesystem_safe(value: &str) -> bool {
    sanitize_filename(value) == value
}

fn is_illegal_char(ch: char) -> bool {
    matches!(ch, '/' | '?' | '<' | '>' | '\\' | ':' | '*' | '|' | '"')
}

fn is_control_char(ch: char) -> bool {
    matches!(ch, '\u{0}'..='\u{1f}' | '\u{80}'..='\u{9f}')
}

fn is_windows_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).to_ascii_lowercase();
    if WINDOWS_RESERVED.contains(&stem.as_str()) {
        return true;
    }
    WINDOWS_NUMBERED.iter().any(|prefix| {
        stem.strip_prefix(prefix).is_some_and(|rest| {
            let mut chars = rest.chars();
            chars.next().is_some_and(|ch| ch.is_ascii_digit()) && chars.next().is_none()
        })
    })
}

fn trim_trailing_dots_and_spaces(value: &mut String) {
    let trimmed_len = value.trim_end_matches(['.', ' ']).len();
    value.truncate(trimmed_len);
}

fn truncate_to_boundary(value: &mut String, max_bytes: usize) {
    if value.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    value.truncate(cut);
}
