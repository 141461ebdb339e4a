//! 核心层：错误与失败描述、推理阶段、会话取消监管

pub mod error;
pub mod session_supervisor;
pub mod state;

pub use error::{AgentError, FailureDescriptor, FailureKind};
pub use session_supervisor::SessionSupervisor;
pub use state::ReasoningPhase;
