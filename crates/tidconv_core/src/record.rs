use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use thiserror::Error;

pub const TITLE_FIELD: &str = "title";
pub const TEXT_FIELD: &str = "text";
pub const TAGS_FIELD: &str = "tags";

/// One exported tiddler. Keys keep the order they had in the input file.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no `title` field")]
    MissingTitle,
    #[error("`title` must be a string")]
    TitleNotString,
    #[error("title {0:?} has no usable file name")]
    UnusableTitle(String),
    #[error("`tags` of {0:?} must be a string")]
    TagsNotString(String),
}

/// Read a tiddler export: a JSON array whose entries should be objects.
///
/// Entries are returned untouched; shape problems inside an entry are
/// reported per record by the transformer.
pub async fn load_records(path: &Path) -> Result<Vec<Value>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_records(&content).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_records(content: &str) -> Result<Vec<Value>> {
    let parsed: Value = serde_json::from_str(content)?;
    match parsed {
        Value::Array(entries) => Ok(entries),
        other => bail!(
            "expected a JSON array of tiddlers, found {}",
            json_kind(&other)
        ),
    }
}

pub fn as_record(value: &Value) -> Result<&Record, RecordError> {
    value.as_object().ok_or(RecordError::NotAnObject)
}

pub fn record_title(record: &Record) -> Result<&str, RecordError> {
    match record.get(TITLE_FIELD) {
        None => Err(RecordError::MissingTitle),
        Some(Value::String(title)) => Ok(title.as_str()),
        Some(_) => Err(RecordError::TitleNotString),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn parse_records_keeps_field_order() {
        let records =
            parse_records(r#"[{"zeta": "1", "title": "T", "alpha": "2"}]"#).expect("parse");
        let record = as_record(&records[0]).expect("object");
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "title", "alpha"]);
    }

    #[test]
    fn parse_records_rejects_non_array() {
        let error = parse_records(r#"{"title": "T"}"#).expect_err("must fail");
        assert!(error.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn record_title_validation() {
        let missing = json!({"text": "x"});
        assert_eq!(
            record_title(as_record(&missing).expect("object")),
            Err(RecordError::MissingTitle)
        );
        let numeric = json!({"title": 7});
        assert_eq!(
            record_title(as_record(&numeric).expect("object")),
            Err(RecordError::TitleNotString)
        );
        assert_eq!(as_record(&json!("loose")), Err(RecordError::NotAnObject));
    }

    #[tokio::test]
    async fn load_records_reports_unreadable_input() {
        let temp = tempdir().expect("tempdir");
        let error = load_records(&temp.path().join("missing.json"))
            .await
            .expect_err("must fail");
        assert!(error.to_string().contains("failed to read"));
    }

    #[tokio::test]
    async fn load_records_reports_malformed_json() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("tiddlers.json");
        std::fs::write(&path, "[{\"title\": ").expect("write input");
        let error = load_records(&path).await.expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }
}
