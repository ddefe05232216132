//! Newline-delimited JSON evaluation datasets, one `{chunk_id, question}`
//! object per line.

use crate::error::DatasetError;
use crate::metrics::EvaluationItem;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

#[derive(Deserialize)]
struct DatasetLine {
    #[serde(default)]
    chunk_id: String,
    #[serde(default)]
    question: String,
}

/// Parse dataset text. Blank lines, malformed lines and records with an
/// empty `chunk_id` or `question` are skipped.
pub fn parse_dataset(content: &str) -> Vec<EvaluationItem> {
    parse_dataset_bytes(content.as_bytes())
}

/// Parse raw dataset bytes line by line. A line that is not valid UTF-8 is
/// skipped like any other malformed line.
pub fn parse_dataset_bytes(content: &[u8]) -> Vec<EvaluationItem> {
    let mut skipped = 0;
    let items: Vec<EvaluationItem> = content
        .split(|byte| *byte == b'\n')
        .filter(|line| !line.trim_ascii().is_empty())
        .filter_map(|line| match parse_line(line) {
            Some(item) => Some(item),
            None => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        debug!("Skipped {skipped} unusable dataset lines");
    }
    items
}

fn parse_line(line: &[u8]) -> Option<EvaluationItem> {
    let line = std::str::from_utf8(line).ok()?;
    let parsed = serde_json::from_str::<DatasetLine>(line).ok()?;
    (!parsed.chunk_id.is_empty() && !parsed.question.is_empty())
        .then(|| EvaluationItem::new(parsed.chunk_id, parsed.question))
}

/// Read a dataset file
pub async fn read_dataset(path: &Path) -> Result<Vec<EvaluationItem>, DatasetError> {
    let content = tokio::fs::read(path).await?;
    let items = parse_dataset_bytes(&content);
    debug!("Read {} items from {}", items.len(), path.display());
    Ok(items)
}

/// Append items to a dataset file, creating it and its parent directories
pub async fn append_items(path: &Path, items: &[EvaluationItem]) -> Result<(), DatasetError> {
    ensure_parent(path).await?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&encode(items)?).await?;
    file.flush().await?;
    Ok(())
}

/// Replace a dataset file with `items`
pub async fn write_items(path: &Path, items: &[EvaluationItem]) -> Result<(), DatasetError> {
    ensure_parent(path).await?;
    tokio::fs::write(path, encode(items)?).await?;
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn encode(items: &[EvaluationItem]) -> Result<Vec<u8>, DatasetError> {
    let mut buf = Vec::new();
    for item in items {
        serde_json::to_writer(&mut buf, item)?;
        buf.push(b'\n');
    }
    Ok(buf)
}
