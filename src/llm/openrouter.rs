//! OpenRouter 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://openrouter.ai/api/v1
//! - Solver 默认 anthropic/claude-3.5-haiku，Supervisor 默认 openai/gpt-4o-mini

use crate::llm::OpenAiClient;

/// OpenRouter API 常量
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_SOLVER_MODEL: &str = "anthropic/claude-3.5-haiku";
pub const DEFAULT_SUPERVISOR_MODEL: &str = "openai/gpt-4o-mini";

/// 依次尝试的 API Key 环境变量
pub const API_KEY_VARS: [&str; 3] = ["API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"];

/// 从环境变量解析 API Key；`preferred` 为配置中指定的变量名，优先于默认列表
pub fn resolve_api_key(preferred: Option<&str>) -> Option<String> {
    preferred
        .into_iter()
        .chain(API_KEY_VARS)
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
}

/// 创建 OpenRouter 客户端；base_url 为空时使用 OpenRouter 官方地址
pub fn create_openrouter_client(
    base_url: Option<&str>,
    model: &str,
    api_key: Option<&str>,
) -> OpenAiClient {
    let base = base_url.unwrap_or(OPENROUTER_BASE_URL);
    let api_key = api_key
        .map(String::from)
        .or_else(|| resolve_api_key(None))
        .unwrap_or_else(|| "sk-placeholder".to_string());
    OpenAiClient::new(Some(base), model, Some(api_key.as_str()))
}
