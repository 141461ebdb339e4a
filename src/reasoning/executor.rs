//! Step Executor：按计划顺序逐步执行
//!
//! 每一步向 Solver 历史追加指令并基于完整累积上下文请求自由文本，再追加回复；
//! 后一步总能看到前面所有步骤的结果，因此由控制器严格串行调用。

use std::sync::Arc;

use tracing::debug;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::ConversationHistory;
use crate::reasoning::prompts;

pub struct StepExecutor {
    llm: Arc<dyn LlmClient>,
}

impl StepExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 执行单步：追加指令 → 基于全量历史完成 → 追加回复
    pub async fn execute_step(
        &self,
        solver: &mut ConversationHistory,
        step: &str,
    ) -> Result<String, AgentError> {
        solver.push_user(prompts::step_instruction(step));
        let response = match self.llm.complete(solver.messages()).await {
            Ok(r) => r,
            Err(e) => {
                // 未得到回复的指令不留在历史里
                solver.retract_last_pending()?;
                return Err(e.into());
            }
        };
        debug!(step = %step, context_len = solver.len(), "step executed");
        solver.push_assistant(response.clone());
        Ok(response)
    }
}
