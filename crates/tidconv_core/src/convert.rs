use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ConvertConfig;
use crate::document::{Document, RenderOptions, render_record};
use crate::record::{RecordError, TITLE_FIELD, load_records};
use crate::writer::{Collision, WriteFailure, write_documents};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecord {
    /// Position of the entry in the input array.
    pub index: usize,
    pub error: RecordError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub records: usize,
    pub written: usize,
    pub write_failures: Vec<WriteFailure>,
    pub invalid: Vec<InvalidRecord>,
    pub collisions: Vec<Collision>,
}

impl ConversionReport {
    pub fn failed(&self) -> usize {
        self.write_failures.len()
    }

    pub fn summary_lines(&self, output: &Path) -> Vec<String> {
        let mut lines = vec![
            format!("Converted {} tiddlers to Markdown files.", self.written),
            format!("There were {} writing errors to report.", self.failed()),
        ];
        if !self.invalid.is_empty() {
            lines.push(format!(
                "Skipped {} invalid tiddlers.",
                self.invalid.len()
            ));
        }
        if !self.collisions.is_empty() {
            lines.push(format!(
                "{} file names were shared by several tiddlers.",
                self.collisions.len()
            ));
        }
        lines.push(format!(
            "Check your '{}' folder.",
            output.to_string_lossy().replace('\\', "/")
        ));
        lines
    }
}

/// Render every record independently. Invalid records are collected with
/// their input position instead of stopping the batch.
pub fn transform_records(
    records: &[Value],
    options: &RenderOptions,
) -> (Vec<Document>, Vec<InvalidRecord>) {
    let mut documents = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let label = record
            .get(TITLE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("<untitled>");
        info!("Preparing tiddler: {label}...");
        match render_record(record, options) {
            Ok(document) => documents.push(document),
            Err(error) => {
                warn!("Skipping tiddler #{index}: {error}");
                invalid.push(InvalidRecord { index, error });
            }
        }
    }
    (documents, invalid)
}

/// Run the whole batch: create the output folder, load the export, render
/// and write every tiddler.
///
/// Only setup problems (output folder, input file) are returned as errors.
/// Per-record problems end up in the report.
pub async fn convert(config: &ConvertConfig) -> Result<ConversionReport> {
    tokio::fs::create_dir_all(&config.output)
        .await
        .with_context(|| format!("failed to create {}", config.output.display()))?;
    info!("Output folder created at {}.", config.output.display());

    let records = load_records(&config.input).await?;
    let (documents, invalid) = transform_records(&records, &config.render);
    info!("Finished preparing tiddlers.");

    let writes = write_documents(&config.output, &documents).await;
    Ok(ConversionReport {
        records: records.len(),
        written: writes.written,
        write_failures: writes.failures,
        invalid,
        collisions: writes.collisions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn setup(records: Value) -> (TempDir, ConvertConfig) {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("tiddlers.json");
        fs::write(&input, serde_json::to_string_pretty(&records).expect("json"))
            .expect("write input");
        let config = ConvertConfig {
            input,
            output: temp.path().join("nested").join("output"),
            verbose: false,
            render: RenderOptions::default(),
        };
        (temp, config)
    }

    fn read_dir_sorted(dir: &Path) -> Vec<(String, Vec<u8>)> {
        let mut entries: Vec<(String, Vec<u8>)> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| {
                let entry = entry.expect("entry");
                let name = entry.file_name().to_string_lossy().to_string();
                (name, fs::read(entry.path()).expect("read file"))
            })
            .collect();
        entries.sort();
        entries
    }

    #[tokio::test]
    async fn converts_records_into_markdown_files() {
        let (_temp, config) = setup(json!([
            {"title": "A/B", "tags": "x y", "text": "hello"},
            {"title": "Second", "text": "world"}
        ]));

        let report = convert(&config).await.expect("convert");

        assert_eq!(report.records, 2);
        assert_eq!(report.written, 2);
        assert_eq!(report.failed(), 0);
        let first = fs::read_to_string(config.output.join("AB.md")).expect("read AB");
        assert_eq!(
            first,
            "---\ntitle: 'A/B'\ntags : [ x,y ]\naliases: [ 'A/B' ]\n---\n\nhello\n"
        );
        assert!(config.output.join("Second.md").is_file());
    }

    #[tokio::test]
    async fn one_failed_write_does_not_stop_the_batch() {
        let (_temp, config) = setup(json!([
            {"title": "One", "text": "1"},
            {"title": "Two", "text": "2"},
            {"title": "Three", "text": "3"}
        ]));
        fs::create_dir_all(config.output.join("Two.md")).expect("blocking dir");

        let report = convert(&config).await.expect("batch completes");

        assert_eq!(report.written, 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.write_failures[0].title, "Two");
        assert_eq!(
            report.summary_lines(Path::new("output")),
            vec![
                "Converted 2 tiddlers to Markdown files.".to_string(),
                "There were 1 writing errors to report.".to_string(),
                "Check your 'output' folder.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn rerun_produces_identical_files() {
        let (_temp, config) = setup(json!([
            {"title": "Alpha", "tags": "[[Big Idea]] misc", "text": "a"},
            {"title": "$:/config/x", "caption": "Bob's", "text": "b"},
            {"title": "Gamma", "modified": "20240101000000000"}
        ]));

        convert(&config).await.expect("first run");
        let first = read_dir_sorted(&config.output);
        convert(&config).await.expect("second run");
        let second = read_dir_sorted(&config.output);

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn colliding_titles_leave_exactly_one_file() {
        let (_temp, config) = setup(json!([
            {"title": "A/B", "text": "first"},
            {"title": "A:B", "text": "second"}
        ]));

        let report = convert(&config).await.expect("convert");

        assert_eq!(report.collisions.len(), 1);
        let files = read_dir_sorted(&config.output);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "AB.md");
        assert!(String::from_utf8_lossy(&files[0].1).contains("second"));
    }

    #[tokio::test]
    async fn invalid_records_are_reported_not_written() {
        let (_temp, config) = setup(json!([
            {"text": "no title"},
            {"title": "Good"},
            {"title": "Bad tags", "tags": ["a"]},
            "not an object"
        ]));

        let report = convert(&config).await.expect("convert");

        assert_eq!(report.records, 4);
        assert_eq!(report.written, 1);
        assert_eq!(
            report.invalid,
            vec![
                InvalidRecord {
                    index: 0,
                    error: RecordError::MissingTitle
                },
                InvalidRecord {
                    index: 2,
                    error: RecordError::TagsNotString("Bad tags".to_string())
                },
                InvalidRecord {
                    index: 3,
                    error: RecordError::NotAnObject
                },
            ]
        );
        assert!(
            report
                .summary_lines(&config.output)
                .contains(&"Skipped 3 invalid tiddlers.".to_string())
        );
    }

    #[tokio::test]
    async fn unreadable_input_is_fatal() {
        let (temp, mut config) = setup(json!([]));
        config.input = temp.path().join("missing.json");
        let error = convert(&config).await.expect_err("must fail");
        assert!(format!("{error:#}").contains("failed to read"));
    }

    #[tokio::test]
    async fn uncreatable_output_is_fatal() {
        let (temp, mut config) = setup(json!([{"title": "T"}]));
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "file").expect("write blocker");
        config.output = PathBuf::from(&blocker).join("output");
        let error = convert(&config).await.expect_err("must fail");
        assert!(error.to_string().contains("failed to create"));
    }
}
