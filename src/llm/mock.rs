//! Mock LLM 客户端（用于测试，无需 API）
//!
//! ScriptedLlmClient 按队列回放预设的自由文本 / 结构化回复，并记录每次调用的消息快照，
//! 便于断言调用次数、调用顺序以及每次调用看到的上下文。
//! 自由文本队列为空时回显最后一条 User 消息。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::llm::structured::{OutputSchema, StructuredReply};
use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// 一次调用的记录
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// None 为自由文本调用，Some(name) 为结构化调用
    pub schema: Option<String>,
    pub messages: Vec<Message>,
}

impl RecordedCall {
    pub fn is_structured(&self) -> bool {
        self.schema.is_some()
    }
}

#[derive(Debug, Default)]
struct Script {
    texts: VecDeque<Result<String, LlmError>>,
    structured: VecDeque<Result<StructuredReply, LlmError>>,
    calls: Vec<RecordedCall>,
}

/// 脚本化客户端：回放队列中的回复
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    script: Mutex<Script>,
    latency: Option<Duration>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用先等待 latency（配合 tokio::time::pause 测试超时）
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.lock().texts.push_back(Ok(text.into()));
    }

    pub fn push_error(&self, err: LlmError) {
        self.lock().texts.push_back(Err(err));
    }

    /// 追加一个结构化回复（序列化为 JSON）
    pub fn push_json<T: Serialize>(&self, value: &T) {
        let raw = serde_json::to_string(value).unwrap_or_default();
        self.lock()
            .structured
            .push_back(Ok(StructuredReply::Content(raw)));
    }

    pub fn push_raw_structured(&self, raw: impl Into<String>) {
        self.lock()
            .structured
            .push_back(Ok(StructuredReply::Content(raw.into())));
    }

    pub fn push_refusal(&self, reason: impl Into<String>) {
        self.lock()
            .structured
            .push_back(Ok(StructuredReply::Refusal(reason.into())));
    }

    pub fn push_structured_error(&self, err: LlmError) {
        self.lock().structured.push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// 指定 Schema 名称的结构化调用次数
    pub fn structured_calls(&self, schema: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.schema.as_deref() == Some(schema))
            .count()
    }

    pub fn text_calls(&self) -> usize {
        self.lock().calls.iter().filter(|c| !c.is_structured()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // 测试内 panic 后仍可读取记录
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn delay(&self) {
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let next = {
            let mut script = self.lock();
            script.calls.push(RecordedCall {
                schema: None,
                messages: messages.to_vec(),
            });
            script.texts.pop_front()
        };
        self.delay().await;
        match next {
            Some(reply) => reply,
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                Ok(format!("Echo from Mock: {}", last_user))
            }
        }
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<StructuredReply, LlmError> {
        let next = {
            let mut script = self.lock();
            script.calls.push(RecordedCall {
                schema: Some(schema.name.clone()),
                messages: messages.to_vec(),
            });
            script.structured.pop_front()
        };
        self.delay().await;
        next.unwrap_or_else(|| {
            Err(LlmError::Api(format!(
                "no scripted structured reply for {}",
                schema.name
            )))
        })
    }
}
