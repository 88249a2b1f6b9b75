//! The retrieval-augmented conversation pipeline.
//!
//! One `Pipeline` instance per session, constructed once at startup and
//! long-lived; it owns the model client, the history adapter and the
//! embedding index. Each request runs four explicit stages in order:
//! rewrite -> retrieve -> generate -> persist. Every stage except
//! generation has a declared fallback, so the only request-fatal error
//! is `Error::Generation`.
//!
//! The index is built once at bootstrap from the history snapshot taken
//! at that moment. Turns appended while the process runs are visible to
//! conversation memory but not to semantic retrieval until restart.

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::corpus::{build_history_document, load_knowledge_documents};
use crate::history::{HistoryStore, Message, Role};
use crate::integrations::{ChatMessage, OpenAIClient};
use crate::metrics;
use crate::prompts;
use crate::rag::{Chunker, EmbeddingIndex, ScoredChunk};
use crate::{Error, Result};

const REWRITE_TEMPERATURE: f32 = 0.0;
const REWRITE_MAX_TOKENS: u32 = 128;

#[derive(Debug)]
pub struct Pipeline {
    llm: OpenAIClient,
    history: HistoryStore,
    index: EmbeddingIndex,
    config: Config,
    /// Serializes the read-then-append window of one turn; the design
    /// fixes a single session, so a single lock is enough.
    turn_lock: Mutex<()>,
}

impl Pipeline {
    /// Construct the pipeline: load the corpus, snapshot the history,
    /// chunk everything and build the embedding index. `CorpusLoad` and
    /// `EmbeddingService` abort startup; an unavailable history store
    /// degrades to an empty snapshot.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let llm = OpenAIClient::new(
            config.openai_api_key.as_str(),
            config.openai_base_url.as_str(),
        )?;
        let history = HistoryStore::new(
            config.history_base_url.as_str(),
            config.history_token.as_str(),
            config.session_key.as_str(),
        )?;

        let mut documents = load_knowledge_documents(&config.corpus_path)?;
        info!("loaded {} knowledge documents", documents.len());

        let snapshot = match history.read_all().await {
            Ok(messages) => messages,
            Err(err) => {
                warn!("history unavailable at bootstrap, starting empty: {}", err);
                metrics::record_stage_fallback("history_read");
                Vec::new()
            }
        };
        documents.push(build_history_document(&snapshot));

        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap);
        let chunks = chunker.split_documents(&documents);
        let index = EmbeddingIndex::build(&llm, &config.embedding_model, chunks).await?;
        info!("embedding index ready: {} chunks", index.len());
        metrics::set_indexed_chunks(index.len());

        Ok(Self {
            llm,
            history,
            index,
            config,
            turn_lock: Mutex::new(()),
        })
    }

    /// Number of chunks in the retrieval index.
    pub fn indexed_chunks(&self) -> usize {
        self.index.len()
    }

    /// Run one conversational turn. Returns the reply text, or
    /// `Error::Generation` when the completion service fails; every
    /// other failure degrades inside its stage. Both history appends
    /// happen only after generation succeeds.
    pub async fn chat(&self, input: &str) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidArgument("input is required".to_string()));
        }

        let _turn = self.turn_lock.lock().await;

        let history = match self.history.read_all().await {
            Ok(messages) => messages,
            Err(err) => {
                warn!("history read failed, continuing without memory: {}", err);
                metrics::record_stage_fallback("history_read");
                Vec::new()
            }
        };

        let query = self.rewrite_or_fallback(&history, input).await;
        let retrieved = self.retrieve(&query).await;
        let reply = self.generate(&retrieved, &history, input).await?;

        if let Err(err) = self.history.append(Role::User, input).await {
            warn!("failed to persist user turn: {}", err);
            metrics::record_stage_fallback("history_append");
        }
        if let Err(err) = self.history.append(Role::Agent, &reply).await {
            warn!("failed to persist reply: {}", err);
            metrics::record_stage_fallback("history_append");
        }

        Ok(reply)
    }

    /// Stage 1: turn the latest input plus prior turns into a standalone
    /// search query. With no prior history there is nothing to resolve,
    /// so the input is used verbatim without a model call; on failure
    /// the query likewise falls back to the literal input.
    async fn rewrite_or_fallback(&self, history: &[Message], input: &str) -> String {
        if history.is_empty() {
            return input.to_string();
        }

        match self.try_rewrite(history, input).await {
            Ok(query) => query,
            Err(err) => {
                warn!("query rewrite failed, using literal input: {}", err);
                metrics::record_stage_fallback("rewrite");
                input.to_string()
            }
        }
    }

    async fn try_rewrite(&self, history: &[Message], input: &str) -> Result<String> {
        let messages = assemble_rewrite_messages(history, input);
        let query = self
            .llm
            .chat_completion(
                messages,
                &self.config.chat_model,
                REWRITE_TEMPERATURE,
                REWRITE_MAX_TOKENS,
            )
            .await
            .map_err(|e| Error::Rewrite(e.to_string()))?;

        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(Error::Rewrite("empty rewritten query".to_string()));
        }
        Ok(query)
    }

    /// Stage 2: top-k lookup against the bootstrap-time index. A failed
    /// query embedding degrades to skip-retrieval (empty context) rather
    /// than failing the request.
    async fn retrieve(&self, query: &str) -> Vec<ScoredChunk> {
        let embedding = match self
            .llm
            .embed_batch(&self.config.embedding_model, &[query.to_string()])
            .await
        {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                warn!("embedding service returned no vector for query");
                metrics::record_stage_fallback("retrieve");
                return Vec::new();
            }
            Err(err) => {
                warn!("query embedding failed, skipping retrieval: {}", err);
                metrics::record_stage_fallback("retrieve");
                return Vec::new();
            }
        };

        self.index.search(&embedding, self.config.top_k)
    }

    /// Stage 3: one completion request carrying the persona plus the
    /// retrieved context (injected exactly once), the conversation memory
    /// as prior turns, and the user input.
    async fn generate(
        &self,
        retrieved: &[ScoredChunk],
        history: &[Message],
        input: &str,
    ) -> Result<String> {
        let messages = assemble_generation_messages(retrieved, history, input);
        let reply = self
            .llm
            .chat_completion(
                messages,
                &self.config.chat_model,
                self.config.temperature,
                self.config.max_tokens,
            )
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        Ok(tidy_reply(&reply))
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User | Role::Unknown => "user",
        Role::Agent => "assistant",
    }
}

fn history_turns(history: &[Message]) -> impl Iterator<Item = ChatMessage> + '_ {
    history.iter().map(|m| ChatMessage {
        role: wire_role(m.role).to_string(),
        content: Some(m.text.clone()),
    })
}

fn assemble_rewrite_messages(history: &[Message], input: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(prompts::REWRITE_INSTRUCTION)];
    messages.extend(history_turns(history));
    messages.push(ChatMessage::user(input));
    messages
}

fn context_block(retrieved: &[ScoredChunk]) -> String {
    retrieved
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn assemble_generation_messages(
    retrieved: &[ScoredChunk],
    history: &[Message],
    input: &str,
) -> Vec<ChatMessage> {
    let system = prompts::persona_with_context(&context_block(retrieved));
    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(history_turns(history));
    messages.push(ChatMessage::user(input));
    messages
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ([，。！？、.,!?])").unwrap());

/// Collapse whitespace runs and drop stray spaces before punctuation.
fn tidy_reply(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1").to_string()
}
