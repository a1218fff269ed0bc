//! Append-only conversation log with prefix compression.
//!
//! Entries are never edited or removed individually. The only bulk
//! operation, [`AppendOnlyContext::compress`], moves a prefix of the log to
//! an [`ArchiveSink`] and replaces it with a single reference entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::archive::ArchiveSink;
use crate::error::EngineError;
use crate::llm::message::{ChatMessage, Role};

/// One entry of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Speaker.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Arbitrary caller metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Creation order; strictly increasing across appends.
    pub index: usize,
}

impl ContextEntry {
    /// Whether this entry stands in for archived content.
    #[must_use]
    pub fn is_archive_reference(&self) -> bool {
        self.metadata.contains_key("archive_path")
    }
}

/// Append-only log of conversation entries.
#[derive(Debug, Clone)]
pub struct AppendOnlyContext {
    entries: Vec<ContextEntry>,
    next_index: usize,
    archive_prefix: String,
    compressions: usize,
}

impl AppendOnlyContext {
    /// Creates an empty log whose archives are written under `archive_prefix`.
    pub fn new(archive_prefix: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            next_index: 0,
            archive_prefix: archive_prefix.into(),
            compressions: 0,
        }
    }

    /// Appends an entry and returns its index.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> usize {
        self.append_with_metadata(role, content, Map::new())
    }

    /// Appends an entry with metadata and returns its index.
    pub fn append_with_metadata(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.entries.push(ContextEntry {
            role,
            content: content.into(),
            metadata,
            index,
        });
        index
    }

    /// Live entries in order.
    #[must_use]
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries as chat messages, in insertion order.
    #[must_use]
    pub fn get_messages(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|e| ChatMessage {
                role: e.role,
                content: e.content.clone(),
                tool_calls: Vec::new(),
                tool_call_id: None,
            })
            .collect()
    }

    /// Archives all but the last `keep_last` entries to `sink`.
    ///
    /// The archived prefix is replaced by one system entry naming the
    /// archive path. Returns the path, or `None` when there was nothing to
    /// compress. If the sink write fails the log is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Archive`] if serialization or the write fails.
    pub async fn compress(
        &mut self,
        sink: &dyn ArchiveSink,
        keep_last: usize,
    ) -> Result<Option<String>, EngineError> {
        if self.entries.len() <= keep_last {
            return Ok(None);
        }

        let split = self.entries.len() - keep_last;
        let archived = &self.entries[..split];
        let path = format!(
            "{}/archive-{:04}.json",
            self.archive_prefix.trim_end_matches('/'),
            self.compressions
        );
        let payload = serde_json::to_string_pretty(archived).map_err(|e| EngineError::Archive {
            path: path.clone(),
            message: e.to_string(),
        })?;

        sink.write(&path, &payload).await?;

        let first_index = archived[0].index;
        let reference = ContextEntry {
            role: Role::System,
            content: format!("[{split} earlier entries archived at {path}]"),
            metadata: json!({
                "archive_path": path,
                "archived_count": split,
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
            index: first_index,
        };

        let kept = self.entries.split_off(split);
        self.entries = std::iter::once(reference).chain(kept).collect();
        self.compressions += 1;
        debug!(archived = split, path = %path, "context compressed");
        Ok(Some(path))
    }
}
