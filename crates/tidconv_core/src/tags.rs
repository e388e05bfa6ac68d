use std::collections::HashSet;

use serde_json::Value;

const OPEN: &str = "[[";
const CLOSE: &str = "]]";

/// Parse a tiddler list field (`tags`, `list`, ...) into its members.
///
/// Members are separated by whitespace; `[[double bracketed]]` members may
/// contain spaces. Returns `None` when the value is not a string.
///
/// Whitespace is Unicode `White_Space` (`char::is_whitespace`): U+0085 NEXT
/// LINE separates members while U+FEFF stays inside one, unlike JavaScript `\s`.
pub fn parse_string_array(value: &Value, allow_duplicates: bool) -> Option<Vec<String>> {
    let Value::String(text) = value else {
        return None;
    };
    Some(tokenize(text, allow_duplicates))
}

pub fn tokenize(text: &str, allow_duplicates: bool) -> Vec<String> {
    let mut results = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cursor = 0usize;
    while let Some((token, next)) = next_token(text, cursor) {
        cursor = next;
        if token.is_empty() {
            continue;
        }
        if allow_duplicates || seen.insert(token) {
            results.push(token.to_string());
        }
    }
    results
}

/// Join tokens into the front matter tag list: comma separated, spaces
/// replaced with underscores, lower-cased.
pub fn normalize_tags(tokens: &[String]) -> String {
    tokens.join(",").replace(' ', "_").to_lowercase()
}

fn next_token(text: &str, from: usize) -> Option<(&str, usize)> {
    let offset = text[from..].find(|ch: char| !ch.is_whitespace())?;
    let start = from + offset;
    if let Some(found) = bracketed_at(text, start) {
        return Some(found);
    }
    let tail = &text[start..];
    let len = tail.find(char::is_whitespace).unwrap_or(tail.len());
    Some((&tail[..len], start + len))
}

// The shortest `]]` followed by whitespace or end of input closes the group.
// A group never spans a line terminator; when no close qualifies the caller
// falls back to a bare run.
fn bracketed_at(text: &str, start: usize) -> Option<(&str, usize)> {
    if !text[start..].starts_with(OPEN) {
        return None;
    }
    let inner_start = start + OPEN.len();
    let inner = &text[inner_start..];
    let mut search = 0usize;
    while let Some(found) = inner[search..].find(CLOSE) {
        let close = search + found;
        if inner[..close].contains(is_line_terminator) {
            return None;
        }
        let after = &inner[close + CLOSE.len()..];
        if after.chars().next().is_none_or(char::is_whitespace) {
            return Some((&inner[..close], inner_start + close + CLOSE.len()));
        }
        search = close + 1;
    }
    None
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}
