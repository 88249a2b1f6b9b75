//! External model-provider clients.

pub mod openai;

pub use openai::{ChatMessage, OpenAIClient};
