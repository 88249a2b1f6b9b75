//! Error types for the companion chat pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Knowledge corpus error: {0}")]
    CorpusLoad(String),

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("History store unavailable: {0}")]
    HistoryUnavailable(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Query rewrite failed: {0}")]
    Rewrite(String),

    #[error("Reply generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_corpus_load() {
        let err = Error::CorpusLoad("data/knowledge.json not found".to_string());
        assert!(err.to_string().contains("Knowledge corpus error"));
        assert!(err.to_string().contains("knowledge.json"));
    }

    #[test]
    fn test_error_display_embedding_service() {
        let err = Error::EmbeddingService("connection refused".to_string());
        assert!(err.to_string().contains("Embedding service error"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_display_history_unavailable() {
        let err = Error::HistoryUnavailable("timeout".to_string());
        let msg = err.to_string();
        assert!(msg.contains("History store unavailable"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_error_display_completion() {
        let err = Error::Completion("rate limit exceeded".to_string());
        assert!(err.to_string().contains("Completion service error"));
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn test_error_display_rewrite() {
        let err = Error::Rewrite("empty response".to_string());
        assert!(err.to_string().contains("Query rewrite failed"));
    }

    #[test]
    fn test_error_display_generation() {
        let err = Error::Generation("provider error 500".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Reply generation failed"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn test_error_display_invalid_argument() {
        let err = Error::InvalidArgument("missing required field".to_string());
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::Rewrite("test".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_error_debug_impl() {
        let err = Error::CorpusLoad("bad".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("CorpusLoad"));
    }

    #[test]
    fn test_error_all_variants_debug() {
        let variants: Vec<Error> = vec![
            Error::CorpusLoad("corpus".to_string()),
            Error::EmbeddingService("embed".to_string()),
            Error::HistoryUnavailable("history".to_string()),
            Error::Completion("completion".to_string()),
            Error::Rewrite("rewrite".to_string()),
            Error::Generation("generation".to_string()),
            Error::SerializationError("serial".to_string()),
            Error::InvalidArgument("arg".to_string()),
        ];

        for err in variants {
            let debug_str = format!("{:?}", err);
            assert!(!debug_str.is_empty());
        }
    }

    #[test]
    fn test_error_from_io_various_kinds() {
        let kinds = [
            std::io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::ConnectionRefused,
            std::io::ErrorKind::TimedOut,
        ];

        for kind in kinds {
            let io_err = std::io::Error::new(kind, "test");
            let err: Error = io_err.into();
            assert!(matches!(err, Error::IoError(_)));
        }
    }
}
