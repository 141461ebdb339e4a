//! 记忆层：会话内 Solver / Supervisor 两份独立的对话历史（仅内存，不跨会话持久化）

pub mod conversation;

pub use conversation::{ConversationHistory, HistoryError, Message, Role};
