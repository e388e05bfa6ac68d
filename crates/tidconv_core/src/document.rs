use serde::Deserialize;
use serde_json::Value;

use crate::filename::{is_filesystem_safe, markdown_stem};
use crate::record::{RecordError, TAGS_FIELD, TEXT_FIELD, as_record, record_title};
use crate::tags::{normalize_tags, parse_string_array};

pub const FRONT_MATTER_DELIMITER: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

impl QuoteStyle {
    /// Quote a scalar so the header line stays a valid single-line YAML scalar.
    ///
    /// Single quotes cannot carry line breaks or control characters, so such
    /// values fall back to the escaped double-quoted form.
    pub fn quote(self, value: &str) -> String {
        match self {
            Self::Single if !value.chars().any(needs_escape) => {
                format!("'{}'", value.replace('\'', "''"))
            }
            _ => double_quoted(value),
        }
    }
}

fn needs_escape(ch: char) -> bool {
    (ch.is_control() && ch != '\t') || matches!(ch, '\u{2028}' | '\u{2029}')
}

fn double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other if needs_escape(other) => {
                escaped.push_str(&format!("\\u{:04X}", u32::from(other)));
            }
            other => escaped.push(other),
        }
    }
    escaped.push('"');
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub quote_style: QuoteStyle,
    /// Record the original title under `aliases` when it is not a legal file name.
    pub emit_aliases: bool,
    pub allow_duplicate_tags: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quote_style: QuoteStyle::Single,
            emit_aliases: true,
            allow_duplicate_tags: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub header: Vec<String>,
    pub body: String,
}

impl Document {
    /// File name without extension.
    pub fn file_stem(&self) -> String {
        markdown_stem(&self.title)
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.body.len() + self.header.iter().map(|line| line.len() + 1).sum::<usize>() + 8,
        );
        out.push_str(FRONT_MATTER_DELIMITER);
        out.push('\n');
        for line in &self.header {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(FRONT_MATTER_DELIMITER);
        out.push('\n');
        out.push_str(&self.body);
        out
    }
}

/// Turn one exported tiddler into a front matter document.
///
/// Fields are visited in input order. `text` goes to the body, `tags` is
/// parsed as a tiddler list and every other field becomes a quoted header
/// line.
pub fn render_record(value: &Value, options: &RenderOptions) -> Result<Document, RecordError> {
    let record = as_record(value)?;
    let title = record_title(record)?;
    let stem = markdown_stem(title);
    if stem.is_empty() {
        return Err(RecordError::UnusableTitle(title.to_string()));
    }

    let mut header = Vec::with_capacity(record.len() + 1);
    let mut body = String::new();
    for (key, field) in record {
        match key.as_str() {
            TEXT_FIELD => {
                body.push('\n');
                body.push_str(&field_text(field));
                body.push('\n');
            }
            TAGS_FIELD => {
                let tokens = parse_string_array(field, options.allow_duplicate_tags)
                    .ok_or_else(|| RecordError::TagsNotString(title.to_string()))?;
                header.push(format!("tags : [ {} ]", normalize_tags(&tokens)));
            }
            _ => header.push(format!(
                "{key}: {}",
                options.quote_style.quote(&field_text(field))
            )),
        }
    }

    // A legal title can still be cut short to fit the extension.
    if options.emit_aliases && (!is_filesystem_safe(title) || stem.len() < title.len()) {
        header.push(format!(
            "aliases: [ {} ]",
            options.quote_style.quote(title)
        ));
    }

    Ok(Document {
        title: title.to_string(),
        header,
        body,
    })
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
