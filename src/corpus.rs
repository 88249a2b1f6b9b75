//! Knowledge corpus loading and history-to-document rendering.
//!
//! Two document provenances feed the retrieval index: static knowledge
//! records loaded once at startup, and one synthetic document rendered
//! from the conversation history snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::history::Message;
use crate::prompts::EMPTY_HISTORY_PLACEHOLDER;
use crate::{Error, Result};

/// Metadata key carried by every document.
pub const SOURCE_KEY: &str = "source";

/// Source label of the synthetic history document.
pub const HISTORY_SOURCE: &str = "chat_history";

/// A unit of indexable text with its provenance.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(SOURCE_KEY.to_string(), source.into());
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct KnowledgeRecord {
    source: Option<String>,
    content: String,
}

/// Load the static knowledge corpus from a JSON array of records.
/// Missing file, malformed JSON, or an effectively empty corpus is fatal
/// to startup: there is no retrieval without a knowledge base.
pub fn load_knowledge_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| Error::CorpusLoad(format!("failed to read {}: {}", path.display(), e)))?;

    let records: Vec<KnowledgeRecord> = serde_json::from_str(&content)
        .map_err(|e| Error::CorpusLoad(format!("malformed corpus {}: {}", path.display(), e)))?;

    let documents: Vec<Document> = records
        .into_iter()
        .enumerate()
        .filter(|(_, r)| !r.content.trim().is_empty())
        .map(|(i, r)| {
            let source = r.source.unwrap_or_else(|| format!("knowledge_{}", i));
            Document::new(r.content, source)
        })
        .collect();

    if documents.is_empty() {
        return Err(Error::CorpusLoad(format!(
            "corpus {} contains no usable records",
            path.display()
        )));
    }

    Ok(documents)
}

/// Render the message sequence into one document, one `role: text` line per
/// message in original order. An empty sequence yields the fixed placeholder
/// so the chunker never sees an empty string.
pub fn build_history_document(messages: &[Message]) -> Document {
    if messages.is_empty() {
        return Document::new(EMPTY_HISTORY_PLACEHOLDER, HISTORY_SOURCE);
    }

    let content = messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.text))
        .collect::<Vec<_>>()
        .join("\n");

    Document::new(content, HISTORY_SOURCE)
}
