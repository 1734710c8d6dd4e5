//! Reading the tail of newline-delimited JSON chat logs.
//!
//! A chat log holds one JSON object per line: a metadata header followed by
//! message records. Only the last non-blank line is of interest here.

use crate::models::chat::MessageRecord;
use std::path::{ Path, PathBuf };
use thiserror::Error;

pub const CHAT_LOG_EXTENSION: &str = "jsonl";

#[derive(Debug, Error)]
pub enum LogFileError {
    #[error("failed to read chat log '{path}': {source}")] Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse last record: {0}")] Parse(#[from] serde_json::Error),
}

fn chat_log_stem(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(CHAT_LOG_EXTENSION)?.strip_suffix('.')
}

pub fn is_chat_log(file_name: &str) -> bool {
    chat_log_stem(file_name).is_some()
}

/// File name without the `.jsonl` suffix.
pub fn chat_file_id(file_name: &str) -> &str {
    chat_log_stem(file_name).unwrap_or(file_name)
}

/// Trims whitespace and byte-order marks.
fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Parses the final record of a chat log's content.
///
/// Returns `Ok(None)` when the log has no message after its metadata line
/// (fewer than two non-blank lines).
pub fn last_record(content: &str) -> Result<Option<MessageRecord>, LogFileError> {
    let lines: Vec<&str> = content
        .split('\n')
        .map(trim_line)
        .filter(|line| !line.is_empty())
        .collect();
    match lines.as_slice() {
        [_metadata, .., last] => Ok(Some(serde_json::from_str(last)?)),
        _ => Ok(None),
    }
}

pub async fn read_last_record(path: &Path) -> Result<Option<MessageRecord>, LogFileError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LogFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    last_record(&String::from_utf8_lossy(&bytes))
}
