//! Fixed prompt texts for the companion persona and pipeline stages.

/// Persona script for the response generator. `{context}` is replaced with
/// the concatenated retrieved chunks, exactly once per call.
pub const PERSONA_SCRIPT: &str = r#"你是"小暖"，一位专为老年朋友提供情感陪伴的聊天伙伴。
你的任务是倾听、安慰、陪伴，让老人感到被关心。

要求：
- 语气温暖亲切，像家里的晚辈一样
- 用简单的词语和简短的句子
- 不使用专业术语，不长篇大论
- 多关心对方的感受和日常生活

参考资料（回答时可以使用）：
{context}"#;

/// Instruction for the query rewrite stage: turn the latest user turn plus
/// prior conversation into one standalone search query.
pub const REWRITE_INSTRUCTION: &str =
    "结合对话内容，把用户的最新一句话改写成一个能独立表达其意图的简短搜索查询。只输出查询本身，不要解释。";

/// User-visible reply when generation fails. Never expose provider errors.
pub const FALLBACK_REPLY: &str = "对不起，我现在有点累了，休息一下再陪您聊，好吗？";

/// Content of the synthetic history document when the conversation is empty,
/// so the chunker never receives an empty string.
pub const EMPTY_HISTORY_PLACEHOLDER: &str = "这是一段新对话的开始，还没有聊天记录。";

/// Shown when the retriever comes back empty-handed.
pub const NO_CONTEXT_PLACEHOLDER: &str = "（暂无参考资料）";

/// Inject retrieved context into the persona script.
pub fn persona_with_context(context: &str) -> String {
    let context = if context.trim().is_empty() {
        NO_CONTEXT_PLACEHOLDER
    } else {
        context
    };
    PERSONA_SCRIPT.replace("{context}", context)
}
