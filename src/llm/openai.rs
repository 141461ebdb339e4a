//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 OpenRouter、OpenAI、自建代理等。
//! 结构化调用使用 `response_format = json_schema (strict)`，服务端拒绝时返回 StructuredReply::Refusal。
//! 底层 HTTP 连接池由 async_openai::Client 持有，可被多个会话并发共享。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::error::{ApiError, OpenAIError};
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    ResponseFormat, ResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

use crate::llm::structured::{OutputSchema, StructuredReply};
use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// 将 async_openai 错误归类为 LlmError（区分限流 / 服务端 5xx / 网络 / 其它 API 错误）
fn map_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api) => {
            let text = api.to_string();
            let lower = text.to_lowercase();
            if lower.contains("rate limit") || lower.contains("rate_limit") {
                LlmError::RateLimited { retry_after_ms: 0 }
            } else if is_server_error(&api, &lower) {
                LlmError::Server(text)
            } else {
                LlmError::Api(text)
            }
        }
        OpenAIError::Reqwest(e) => LlmError::Network(e.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg),
        other => LlmError::Api(other.to_string()),
    }
}

/// server_error 类型、5xx 状态码，或上游过载 / 不可用的描述
fn is_server_error(api: &ApiError, lower: &str) -> bool {
    if api.r#type.as_deref() == Some("server_error") {
        return true;
    }
    if let Some(code) = api.code.as_deref() {
        if code.len() == 3 && code.starts_with('5') && code.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
    }
    ["overloaded", "service unavailable", "internal server error", "bad gateway", "gateway timeout"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// OpenAI 兼容客户端：持有 Client 与 model 名，complete 时转 Message 为 API 格式并取首条 content
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new()
                .with_api_base(url)
                .with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            usage: TokenUsage::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_openai_message(m: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
        let msg = match m.role {
            Role::System => {
                let mut args = ChatCompletionRequestSystemMessageArgs::default();
                args.content(m.content.clone());
                if let Some(name) = &m.name {
                    args.name(name.clone());
                }
                ChatCompletionRequestMessage::System(args.build()?)
            }
            Role::User => {
                let mut args = ChatCompletionRequestUserMessageArgs::default();
                args.content(m.content.clone());
                if let Some(name) = &m.name {
                    args.name(name.clone());
                }
                ChatCompletionRequestMessage::User(args.build()?)
            }
            Role::Assistant => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                args.content(m.content.clone());
                if let Some(name) = &m.name {
                    args.name(name.clone());
                }
                ChatCompletionRequestMessage::Assistant(args.build()?)
            }
        };
        Ok(msg)
    }

    fn build_request(
        &self,
        messages: &[Message],
        schema: Option<&OutputSchema>,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        if messages.is_empty() {
            return Err(LlmError::InvalidRequest("empty message sequence".to_string()));
        }
        let converted = messages
            .iter()
            .map(Self::to_openai_message)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_openai_error)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(converted);
        if let Some(s) = schema {
            args.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: s.name.clone(),
                    schema: Some(s.schema.clone()),
                    strict: Some(true),
                },
            });
        }
        args.build().map_err(map_openai_error)
    }

    async fn send(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, LlmError> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        // 提取 token 使用统计
        if let Some(usage) = &response.usage {
            self.usage.add(
                usage.prompt_tokens as u64,
                usage.completion_tokens as u64,
            );
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = self.build_request(messages, None)?;
        let response = self.send(request).await?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(LlmError::EmptyResponse)
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<StructuredReply, LlmError> {
        let request = self.build_request(messages, Some(schema))?;
        let response = self.send(request).await?;
        let message = &response
            .choices
            .first()
            .ok_or(LlmError::EmptyResponse)?
            .message;

        if let Some(reason) = &message.refusal {
            debug!(model = %self.model, schema = %schema.name, "structured output refused");
            return Ok(StructuredReply::Refusal(reason.clone()));
        }
        message
            .content
            .clone()
            .map(StructuredReply::Content)
            .ok_or(LlmError::EmptyResponse)
    }
}
