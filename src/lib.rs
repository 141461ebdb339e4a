//! Overseer - Solver / Supervisor 双智能体推理聊天核心
//!
//! 模块划分：
//! - **agent**: 无头聊天运行时（会话状态、process_input、重置与推理开关）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与失败描述、推理阶段、取消监管
//! - **llm**: 完成网关抽象与实现（OpenAI 兼容 / OpenRouter / Scripted Mock）、结构化输出、重试
//! - **memory**: Solver / Supervisor 对话历史
//! - **observability**: 日志初始化
//! - **reasoning**: Analysis、Step Executor、Critique、Refinement 与收敛控制器

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod reasoning;

pub use agent::{process_input, reset_session, toggle_reasoning, ChatSession, Reply};
pub use reasoning::{ConvergenceController, ReasoningOutcome, ReasoningSession};
