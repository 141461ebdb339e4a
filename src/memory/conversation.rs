//! 短期记忆：单角色对话历史
//!
//! 每个会话为 Solver 与 Supervisor 各持有一份 ConversationHistory。
//! 首条消息永远是该角色固定的 system 前言；除 reset / retract_last_pending 外只允许追加。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// 单条消息；追加后不可修改
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// 可选的发言者标签（如 supervisor 来源的修正指令）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 历史编辑错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history holds only its preamble, nothing to retract")]
    PreambleOnly,
}

/// 单角色对话历史：messages[0] 恒为前言
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(preamble)],
        }
    }

    pub fn preamble(&self) -> &Message {
        &self.messages[0]
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>, name: Option<&str>) {
        let mut msg = Message {
            role,
            content: content.into(),
            name: None,
        };
        if let Some(n) = name {
            msg = msg.with_name(n);
        }
        self.messages.push(msg);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.append(Role::User, content, None);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.append(Role::Assistant, content, None);
    }

    /// 截断到仅剩前言
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// 移除恰好一条尾部消息；仅剩前言时失败
    pub fn retract_last_pending(&mut self) -> Result<Message, HistoryError> {
        if self.messages.len() <= 1 {
            return Err(HistoryError::PreambleOnly);
        }
        self.messages.pop().ok_or(HistoryError::PreambleOnly)
    }

    /// 尾部是否为尚未得到回复的 user 轮次
    pub fn has_pending(&self) -> bool {
        self.messages.len() > 1
            && self
                .messages
                .last()
                .map(|m| m.role == Role::User)
                .unwrap_or(false)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> &Message {
        // messages 至少含前言
        &self.messages[self.messages.len() - 1]
    }

    /// 最近一条 assistant 消息内容
    pub fn last_assistant(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// 渲染为 `role: "content"` 行（不含前言），用于嵌入 Supervisor 请求
    pub fn transcript(&self) -> String {
        self.messages[1..]
            .iter()
            .map(|m| format!("{}: \"{}\"", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// 仅含前言时视为空
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_has_preamble() {
        let h = ConversationHistory::new("you are a solver");
        assert_eq!(h.len(), 1);
        assert_eq!(h.preamble(), &Message::system("you are a solver"));
        assert!(h.is_empty());
    }

    #[test]
    fn test_reset_truncates_to_preamble() {
        let mut h = ConversationHistory::new("pre");
        h.push_user("q");
        h.push_assistant("a");
        h.append(Role::User, "fix it", Some("supervisor"));
        h.reset();
        assert_eq!(h.messages(), &[Message::system("pre")]);
        h.reset();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_retract_last_pending() {
        let mut h = ConversationHistory::new("pre");
        assert_eq!(h.retract_last_pending(), Err(HistoryError::PreambleOnly));
        h.push_user("critique please");
        assert!(h.has_pending());
        let removed = h.retract_last_pending().unwrap();
        assert_eq!(removed.content, "critique please");
        assert_eq!(h.len(), 1);
        assert!(!h.has_pending());
    }

    #[test]
    fn test_named_message_and_transcript() {
        let mut h = ConversationHistory::new("pre");
        h.push_user("9.11 or 9.9?");
        h.append(Role::User, "refine", Some("supervisor"));
        h.push_assistant("9.9");
        assert_eq!(h.messages()[2].name.as_deref(), Some("supervisor"));
        assert_eq!(
            h.transcript(),
            "user: \"9.11 or 9.9?\"\nuser: \"refine\"\nassistant: \"9.9\""
        );
        assert_eq!(h.last_assistant(), Some("9.9"));
    }
}
