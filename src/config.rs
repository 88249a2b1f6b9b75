//! Configuration for the companion chat service
//!
//! Loads configuration from config.yml file.
//! Environment variables take precedence over `${VAR}` placeholders.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CORPUS_PATH: &str = "data/knowledge.json";
pub const DEFAULT_SESSION_KEY: &str = "chat_history";
pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;
pub const DEFAULT_TOP_K: usize = 2;

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    server: Option<ServerSection>,
    openai: Option<OpenAISection>,
    history: Option<HistorySection>,
    retrieval: Option<RetrievalSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAISection {
    base_url: Option<String>,
    api_key: Option<String>,
    chat_model: Option<String>,
    embedding_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct HistorySection {
    base_url: Option<String>,
    token: Option<String>,
    session_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalSection {
    corpus_path: Option<String>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub history_base_url: String,
    pub history_token: String,
    pub session_key: String,
    pub corpus_path: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults.
    /// Environment variables take precedence over config.yml values.
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            } else {
                return v.clone();
            }
        }
        // Fallback: check explicit env_key
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        String::new()
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        let server = yaml.server.unwrap_or_default();
        let openai = yaml.openai.unwrap_or_default();
        let history = yaml.history.unwrap_or_default();
        let retrieval = yaml.retrieval.unwrap_or_default();

        let openai_api_key = Self::resolve_env_string(openai.api_key, "OPENAI_API_KEY");
        let openai_base_url = {
            let resolved = Self::resolve_env_string(openai.base_url, "OPENAI_BASE_URL");
            if resolved.is_empty() {
                "https://api.openai.com/v1".to_string()
            } else {
                resolved
            }
        };
        let history_base_url = Self::resolve_env_string(history.base_url, "HISTORY_BASE_URL");
        let history_token = Self::resolve_env_string(history.token, "HISTORY_TOKEN");

        Ok(Self {
            addr: server.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            openai_base_url,
            openai_api_key,
            chat_model: openai.chat_model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            embedding_model: openai
                .embedding_model
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            temperature: openai.temperature.unwrap_or(0.7),
            max_tokens: openai.max_tokens.unwrap_or(300),
            history_base_url,
            history_token,
            session_key: history
                .session_key
                .unwrap_or_else(|| DEFAULT_SESSION_KEY.to_string()),
            corpus_path: retrieval
                .corpus_path
                .unwrap_or_else(|| DEFAULT_CORPUS_PATH.to_string()),
            chunk_size: retrieval.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: retrieval.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            top_k: retrieval.top_k.unwrap_or(DEFAULT_TOP_K),
        })
    }

    /// Create config with empty credentials (fallback).
    /// User MUST provide config.yml or env vars with actual credentials.
    pub fn defaults() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.7,
            max_tokens: 300,
            history_base_url: std::env::var("HISTORY_BASE_URL").unwrap_or_default(),
            history_token: std::env::var("HISTORY_TOKEN").unwrap_or_default(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            corpus_path: DEFAULT_CORPUS_PATH.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_defaults_have_expected_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        let config = Config::defaults();

        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.session_key, DEFAULT_SESSION_KEY);
        assert_eq!(config.corpus_path, DEFAULT_CORPUS_PATH);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn test_load_from_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
server:
  addr: "0.0.0.0:9000"

openai:
  base_url: "http://localhost:11434/v1"
  chat_model: "qwen2.5"
  temperature: 0.4
  max_tokens: 256

history:
  base_url: "http://localhost:8091"
  session_key: "my_session"

retrieval:
  corpus_path: "data/corpus.json"
  chunk_size: 120
  chunk_overlap: 10
  top_k: 3
"#;
        let temp_file = std::env::temp_dir().join("companion_config_yaml.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();

        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.openai_base_url, "http://localhost:11434/v1");
        assert_eq!(config.chat_model, "qwen2.5");
        assert!((config.temperature - 0.4).abs() < 1e-6);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.history_base_url, "http://localhost:8091");
        assert_eq!(config.session_key, "my_session");
        assert_eq!(config.corpus_path, "data/corpus.json");
        assert_eq!(config.chunk_size, 120);
        assert_eq!(config.chunk_overlap, 10);
        assert_eq!(config.top_k, 3);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn env_placeholders_are_resolved_from_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
openai:
  api_key: "${OPENAI_API_KEY}"

history:
  token: "${HISTORY_TOKEN}"
"#;
        let temp_file = std::env::temp_dir().join("companion_config_env.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let _g1 = EnvGuard::set("OPENAI_API_KEY", "key_from_env");
        let _g2 = EnvGuard::set("HISTORY_TOKEN", "token_from_env");

        let config = Config::load_from_file(&temp_file).unwrap();

        assert_eq!(config.openai_api_key, "key_from_env");
        assert_eq!(config.history_token, "token_from_env");

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn unresolved_placeholder_falls_back_to_explicit_env_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
openai:
  api_key: "${SOME_MISSING_VAR}"
"#;
        let temp_file = std::env::temp_dir().join("companion_config_fallback.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let _g1 = EnvGuard::unset("SOME_MISSING_VAR");
        let _g2 = EnvGuard::set("OPENAI_API_KEY", "explicit_env");

        let config = Config::load_from_file(&temp_file).unwrap();
        assert_eq!(config.openai_api_key, "explicit_env");

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn literal_yaml_values_take_precedence_over_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
openai:
  api_key: "literal_key"
"#;
        let temp_file = std::env::temp_dir().join("companion_config_literal.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let _g = EnvGuard::set("OPENAI_API_KEY", "env_key");

        let config = Config::load_from_file(&temp_file).unwrap();
        assert_eq!(config.openai_api_key, "literal_key");

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn missing_sections_use_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let temp_file = std::env::temp_dir().join("companion_config_empty.yml");
        std::fs::write(&temp_file, "server:\n  addr: \"127.0.0.1:7000\"\n").unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();

        assert_eq!(config.addr, "127.0.0.1:7000");
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.session_key, DEFAULT_SESSION_KEY);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn load_from_file_fails_on_missing_file() {
        let result = Config::load_from_file("/nonexistent/path/config.yml");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file_fails_on_invalid_yaml() {
        let temp_file = std::env::temp_dir().join("companion_config_invalid.yml");
        std::fs::write(&temp_file, "{ invalid yaml [").unwrap();

        let result = Config::load_from_file(&temp_file);
        assert!(result.is_err());

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn config_clone_and_debug() {
        let _lock = ENV_LOCK.lock().unwrap();
        let config = Config::defaults();
        let cloned = config.clone();

        assert_eq!(cloned.addr, config.addr);
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("Config"));
        assert!(debug_str.contains("chunk_size"));
    }
}
