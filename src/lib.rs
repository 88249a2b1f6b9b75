//! Retrieval-augmented companion chat backend
//!
//! This library provides:
//! - A knowledge corpus loader and a history-to-document renderer
//! - A character-overlap chunker and an in-memory embedding index
//! - An explicit four-stage conversation pipeline
//!   (rewrite -> retrieve -> generate -> persist)
//! - A REST adapter for the durable conversation history
//! - A thin HTTP surface with Prometheus metrics

pub mod config;
pub mod corpus;
pub mod error;
pub mod history;
pub mod integrations;
pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod rag;
pub mod server;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use history::{HistoryStore, Message, Role};
pub use integrations::{ChatMessage, OpenAIClient};
pub use pipeline::Pipeline;
