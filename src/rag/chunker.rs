use std::collections::HashMap;

use uuid::Uuid;

use crate::corpus::Document;

/// Text chunk produced by the chunker.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Unique chunk id
    pub id: Uuid,
    /// Raw text of the chunk
    pub text: String,
    /// Char index of the first character in the parent document
    pub start: usize,
    /// Char index after the last character
    pub end: usize,
    /// Metadata copied unmodified from the parent document
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    pub fn new(
        text: String,
        start: usize,
        end: usize,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            start,
            end,
            metadata,
        }
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get(crate::corpus::SOURCE_KEY)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Splitter with character-level overlap. Character units (Unicode scalar
/// values) rather than words: the corpus is Chinese prose, where whitespace
/// tokenization degenerates to one giant token.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a new chunker. Size has a floor of 1, overlap is clamped
    /// below size so the split always advances.
    pub fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            overlap: overlap.min(size.saturating_sub(1)),
        }
    }

    /// Split one document into overlapping chunks. A document no longer
    /// than the chunk size yields exactly one chunk equal to the whole
    /// document; an empty document yields nothing.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut idx = 0;

        while idx < chars.len() {
            let end = (idx + self.size).min(chars.len());
            let text: String = chars[idx..end].iter().collect();
            chunks.push(Chunk::new(text, idx, end, document.metadata.clone()));

            if end == chars.len() {
                break;
            }
            idx += step;
        }

        chunks
    }

    /// Split a sequence of documents; chunk order follows document order
    /// and in-document position.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunk(doc)).collect()
    }
}
