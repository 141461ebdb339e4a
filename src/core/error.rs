//! 核心错误类型与面向传输层的失败描述
//!
//! AgentError 在核心内部用 `?` 传播；交给传输层前转换为 FailureDescriptor（可序列化，不含调用栈）。

use serde::Serialize;
use thiserror::Error;

use crate::llm::LlmError;
use crate::memory::HistoryError;

/// 会话处理过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Cancelled by caller")]
    Cancelled,

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Config error: {0}")]
    Config(String),
}

/// 失败类别（传输层据此决定提示文案或是否重试）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 网关服务错误（传输 / 鉴权 / 限流 / 超时）
    Service,
    Cancelled,
    Internal,
}

/// 交给传输层的类型化失败描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDescriptor {
    pub kind: FailureKind,
    pub message: String,
    /// 立即重试是否可能成功
    pub retryable: bool,
}

impl AgentError {
    pub fn to_failure(&self) -> FailureDescriptor {
        let (kind, retryable) = match self {
            AgentError::Llm(e) => (FailureKind::Service, e.is_transient()),
            AgentError::Cancelled => (FailureKind::Cancelled, true),
            AgentError::History(_) | AgentError::Config(_) => (FailureKind::Internal, false),
        };
        FailureDescriptor {
            kind,
            message: self.to_string(),
            retryable,
        }
    }
}
