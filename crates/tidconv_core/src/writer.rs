use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{info, warn};

use crate::document::Document;
use crate::filename::MARKDOWN_EXTENSION;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub title: String,
    pub path: PathBuf,
    pub message: String,
}

/// Several titles that sanitize to one file name. Titles are listed in write
/// order; the last one owns the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub file_name: String,
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub failures: Vec<WriteFailure>,
    pub collisions: Vec<Collision>,
}

pub fn document_path(dir: &Path, document: &Document) -> PathBuf {
    dir.join(format!("{}.{MARKDOWN_EXTENSION}", document.file_stem()))
}

/// Write one document to `<dir>/<sanitized title>.md`, replacing any existing file.
pub async fn write_document(dir: &Path, document: &Document) -> Result<PathBuf> {
    let path = document_path(dir, document);
    tokio::fs::write(&path, document.render())
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write every document concurrently and tally the outcomes.
///
/// Documents sharing a file name are written one after another in input
/// order inside a single task, so the last of them deterministically owns
/// the file. A failed write never stops the others.
pub async fn write_documents(dir: &Path, documents: &[Document]) -> WriteReport {
    let groups = group_by_file_name(documents);
    let collisions: Vec<Collision> = groups
        .iter()
        .flat_map(|group| exact_collisions(group))
        .collect();
    for collision in &collisions {
        warn!(
            "{} titles map to {}; keeping {:?}",
            collision.titles.len(),
            collision.file_name,
            collision.titles.last().map(String::as_str).unwrap_or_default()
        );
    }

    let tasks = groups.into_iter().map(move |group| async move {
        let mut outcomes = Vec::with_capacity(group.len());
        for document in group {
            outcomes.push(write_logged(dir, document).await);
        }
        outcomes
    });
    let outcomes = join_all(tasks).await;

    outcomes.into_iter().flatten().fold(
        WriteReport {
            collisions,
            ..WriteReport::default()
        },
        |mut report, outcome| {
            match outcome {
                Ok(()) => report.written += 1,
                Err(failure) => report.failures.push(failure),
            }
            report
        },
    )
}

async fn write_logged(dir: &Path, document: &Document) -> Result<(), WriteFailure> {
    let path = document_path(dir, document);
    info!("Writing MD file: {}...", path.display());
    match write_document(dir, document).await {
        Ok(_) => Ok(()),
        Err(error) => {
            warn!(
                "There was an error writing the file for {}: {error:#}",
                document.title
            );
            Err(WriteFailure {
                title: document.title.clone(),
                path,
                message: format!("{error:#}"),
            })
        }
    }
}

/// Group documents whose file names may land on the same file.
///
/// Names are compared case-insensitively so that "Note" and "note" are
/// written in input order on case-insensitive filesystems too. Groups keep
/// input order, both across and within groups.
fn group_by_file_name(documents: &[Document]) -> Vec<Vec<&Document>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<&Document>> = Vec::new();
    for document in documents {
        let key = document.file_stem().to_lowercase();
        match positions.get(&key) {
            Some(&index) => groups[index].push(document),
            None => {
                positions.insert(key, groups.len());
                groups.push(vec![document]);
            }
        }
    }
    groups
}

/// Titles sharing an exact file name inside one group.
fn exact_collisions(group: &[&Document]) -> Vec<Collision> {
    let mut collisions: Vec<Collision> = Vec::new();
    for document in group {
        let file_name = format!("{}.{MARKDOWN_EXTENSION}", document.file_stem());
        match collisions
            .iter_mut()
            .find(|collision| collision.file_name == file_name)
        {
            Some(collision) => collision.titles.push(document.title.clone()),
            None => collisions.push(Collision {
                file_name,
                titles: vec![document.title.clone()],
            }),
        }
    }
    collisions.retain(|collision| collision.titles.len() > 1);
    collisions
}
