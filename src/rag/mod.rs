//! Retrieval support: chunking and the in-memory embedding index.

pub mod chunker;
pub mod index;

pub use chunker::{Chunk, Chunker};
pub use index::{EmbeddingIndex, ScoredChunk};
