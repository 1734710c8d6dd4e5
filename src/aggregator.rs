use crate::history::{ chat_file_id, is_chat_log, read_last_record };
use crate::models::chat::ChatSummary;
use futures::stream::{ self, StreamExt };
use log::{ debug, error, info };
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use thiserror::Error;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "webp", "gif", "jpeg", "jpg"];

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("character_avatar is required.")]
    MissingIdentifier,
    #[error("character_avatar is invalid: '{0}'")] InvalidIdentifier(String),
    #[error("failed to read character chat directory '{path}': {source}")] DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Strips one trailing image extension (case-insensitive) from an avatar name.
pub fn strip_image_extension(identifier: &str) -> &str {
    if let Some((stem, ext)) = identifier.rsplit_once('.') {
        if IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)) {
            return stem;
        }
    }
    identifier
}

fn character_dir_name(identifier: &str) -> Result<&str, AggregationError> {
    if identifier.is_empty() {
        return Err(AggregationError::MissingIdentifier);
    }
    let name = strip_image_extension(identifier);
    let escapes = name.is_empty() ||
        name == "." ||
        name == ".." ||
        name.contains(['/', '\\', '\0']);
    if escapes {
        return Err(AggregationError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(name)
}

/// Collects the last message of every chat log a character owns.
///
/// Holds only configuration, so one instance can serve concurrent calls.
#[derive(Clone, Debug)]
pub struct LastMessageAggregator {
    data_root: PathBuf,
    max_concurrent_reads: usize,
}

impl LastMessageAggregator {
    pub fn new(data_root: impl Into<PathBuf>, max_concurrent_reads: usize) -> Self {
        Self {
            data_root: data_root.into(),
            max_concurrent_reads: max_concurrent_reads.max(1),
        }
    }

    pub fn character_dir(&self, identifier: &str) -> Result<PathBuf, AggregationError> {
        Ok(self.data_root.join("chats").join(character_dir_name(identifier)?))
    }

    pub async fn aggregate(&self, identifier: &str) -> Result<Vec<ChatSummary>, AggregationError> {
        let dir = self.character_dir(identifier)?;

        let file_names = match list_chat_logs(&dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Chat directory not found for {}: {}", identifier, dir.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                error!("Error reading directory {}: {}", dir.display(), source);
                return Err(AggregationError::DirectoryRead { path: dir, source });
            }
        };
        debug!("Found {} chat logs for {}", file_names.len(), identifier);

        let mut summaries: Vec<ChatSummary> = stream
            ::iter(file_names)
            .map(|file_name| {
                let path = dir.join(&file_name);
                async move {
                    match read_last_record(&path).await {
                        Ok(Some(record)) =>
                            Some(ChatSummary {
                                chat_file_id: chat_file_id(&file_name).to_string(),
                                last_message: record,
                            }),
                        Ok(None) => None,
                        Err(e) => {
                            error!(
                                "Error reading or parsing file {} for {}: {}",
                                file_name,
                                identifier,
                                e
                            );
                            None
                        }
                    }
                }
            })
            .buffered(self.max_concurrent_reads)
            .filter_map(|summary| async move { summary })
            .collect().await;

        summaries.sort_by(|a, b| {
            b.last_message.send_date().total_cmp(&a.last_message.send_date())
        });
        Ok(summaries)
    }
}

/// Lists `.jsonl` entry names in `dir`, sorted by name.
async fn list_chat_logs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            if is_chat_log(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
