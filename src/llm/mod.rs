//! LLM 层：完成网关抽象与实现（OpenAI 兼容 / OpenRouter / Scripted Mock）、结构化输出、重试

pub mod mock;
pub mod openai;
pub mod openrouter;
pub mod structured;
pub mod traits;

pub use mock::{RecordedCall, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use openrouter::{
    create_openrouter_client, resolve_api_key, DEFAULT_SOLVER_MODEL, DEFAULT_SUPERVISOR_MODEL,
    OPENROUTER_BASE_URL,
};
pub use structured::{complete_typed, OutputSchema, Structured, StructuredReply};
pub use traits::{LlmClient, LlmError, RetryConfig, RetryingLlmClient};
