//! In-memory embedding index over chunks.
//!
//! Built once at pipeline bootstrap from the knowledge corpus plus the
//! history snapshot, then treated as read-only for the process lifetime.
//! Messages appended after bootstrap are visible to conversation memory
//! but not to semantic retrieval until the next restart.

use tracing::debug;

use crate::integrations::OpenAIClient;
use crate::rag::chunker::Chunk;
use crate::{Error, Result};

/// Stored chunk with its embedding.
#[derive(Debug, Clone)]
struct IndexedChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// A retrieval hit: the chunk and its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Default)]
pub struct EmbeddingIndex {
    entries: Vec<IndexedChunk>,
}

impl EmbeddingIndex {
    /// Embed all chunks in one batched call and build the index.
    /// Unreachable service or malformed output is fatal at bootstrap.
    pub async fn build(
        client: &OpenAIClient,
        model: &str,
        chunks: Vec<Chunk>,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = client.embed_batch(model, &texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(Error::EmbeddingService(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                if embedding.is_empty() || embedding.len() != dimension {
                    return Err(Error::EmbeddingService(format!(
                        "malformed embedding for chunk {} (len {}, expected {})",
                        chunk.id,
                        embedding.len(),
                        dimension
                    )));
                }
                Ok(IndexedChunk { chunk, embedding })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("embedding index built with {} chunks", entries.len());
        Ok(Self { entries })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest-neighbor lookup by cosine similarity: at most `k` hits,
    /// highest score first. Pure function of the index and the query
    /// vector; stable sort keeps results deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k.min(scored.len()));
        scored
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
