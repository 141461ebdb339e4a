//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / OpenRouter / Scripted Mock）实现 LlmClient：complete（自由文本）、
//! complete_structured（按 JSON Schema 约束的结构化输出）。客户端只读消息序列，不修改历史，
//! 请求与回复由调用方显式追加。
//!
//! RetryingLlmClient 为任意后端加上单次调用超时与指数退避重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::llm::structured::{OutputSchema, StructuredReply};
use crate::memory::Message;

/// 网关错误：传输 / 鉴权 / 限流等服务侧失败，永远不会被包装成 assistant 文本
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    /// 服务端 5xx / 上游过载
    #[error("Server error: {0}")]
    Server(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Empty response from LLM")]
    EmptyResponse,
}

impl LlmError {
    /// 是否值得重试（超时、限流、网络抖动、服务端 5xx）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout(_)
                | LlmError::RateLimited { .. }
                | LlmError::Network(_)
                | LlmError::Server(_)
        )
    }
}

/// LLM 客户端 trait：自由文本完成与结构化完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 自由文本完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 结构化完成：返回原始 JSON 内容或服务端拒绝
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<StructuredReply, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 重试与超时策略（对应 [llm.retry] 与 [llm.timeouts]）
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 首次失败后的最大重试次数
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// 单次调用超时
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// 第 attempt 次重试前的等待时间（从 0 开始，指数翻倍，封顶 max_backoff_ms）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// 装饰器：每次调用加超时，瞬时错误按退避重试，非瞬时错误立即返回。
/// 拒绝与 Schema 不合法属于正常结果，不会重试。
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, LlmError>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, LlmError>> + Send,
    {
        let mut attempt = 0u32;
        loop {
            let result = match tokio::time::timeout(self.config.request_timeout, call()).await {
                Ok(r) => r,
                Err(_) => Err(LlmError::Timeout(self.config.request_timeout.as_secs())),
            };
            match result {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let wait = match &e {
                        LlmError::RateLimited { retry_after_ms } if *retry_after_ms > 0 => {
                            Duration::from_millis(*retry_after_ms)
                        }
                        _ => self.config.backoff(attempt),
                    };
                    warn!(op, attempt, error = %e, wait_ms = wait.as_millis() as u64, "transient LLM error, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.with_retry("complete", || self.inner.complete(messages))
            .await
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<StructuredReply, LlmError> {
        self.with_retry("complete_structured", || {
            self.inner.complete_structured(messages, schema)
        })
        .await
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let cfg = RetryConfig {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 350,
            request_timeout: Duration::from_secs(1),
        };
        assert_eq!(cfg.backoff(0), Duration::from_millis(100));
        assert_eq!(cfg.backoff(1), Duration::from_millis(200));
        assert_eq!(cfg.backoff(2), Duration::from_millis(350));
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout(3).is_transient());
        assert!(LlmError::RateLimited { retry_after_ms: 10 }.is_transient());
        assert!(LlmError::Network("reset".into()).is_transient());
        assert!(LlmError::Server("upstream overloaded".into()).is_transient());
        assert!(!LlmError::Api("401 unauthorized".into()).is_transient());
        assert!(!LlmError::EmptyResponse.is_transient());
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_error(LlmError::Network("connection reset".into()));
        mock.push_text("hello");
        let client = RetryingLlmClient::new(mock.clone(), fast_config());
        let out = client.complete(&[Message::user("hi")]).await.unwrap();
        assert_eq!(out, "hello");
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_error(LlmError::Server("503 service unavailable".into()));
        mock.push_text("recovered");
        let client = RetryingLlmClient::new(mock.clone(), fast_config());
        let out = client.complete(&[Message::user("hi")]).await.unwrap();
        assert_eq!(out, "recovered");
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_surfaces_immediately() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_error(LlmError::Api("invalid api key".into()));
        mock.push_text("never reached");
        let client = RetryingLlmClient::new(mock.clone(), fast_config());
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert_eq!(err, LlmError::Api("invalid api key".into()));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mock = Arc::new(ScriptedLlmClient::new());
        for _ in 0..3 {
            mock.push_error(LlmError::RateLimited { retry_after_ms: 1 });
        }
        let client = RetryingLlmClient::new(mock.clone(), fast_config());
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out() {
        let mock = Arc::new(ScriptedLlmClient::new().with_latency(Duration::from_secs(30)));
        mock.push_text("too late");
        let client = RetryingLlmClient::new(
            mock,
            RetryConfig {
                max_retries: 0,
                request_timeout: Duration::from_secs(2),
                ..fast_config()
            },
        );
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert_eq!(err, LlmError::Timeout(2));
    }
}
