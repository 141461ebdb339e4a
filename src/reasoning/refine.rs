//! Refinement Stage：把 Supervisor 的批判指令交给 Solver，取回修订后的答案

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{ConversationHistory, Role};
use crate::reasoning::prompts;

/// 修正指令的来源标签
pub const SUPERVISOR_LABEL: &str = "supervisor";

pub struct Refiner {
    llm: Arc<dyn LlmClient>,
}

impl Refiner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 追加带 supervisor 标签的修正指令 → 完成 → 追加修订答案，并返回该答案
    pub async fn refine(
        &self,
        solver: &mut ConversationHistory,
        instructions: &str,
        round: u32,
    ) -> Result<String, AgentError> {
        solver.append(
            Role::User,
            prompts::refinement_instruction(round, instructions),
            Some(SUPERVISOR_LABEL),
        );
        let revised = match self.llm.complete(solver.messages()).await {
            Ok(r) => r,
            Err(e) => {
                solver.retract_last_pending()?;
                return Err(e.into());
            }
        };
        solver.push_assistant(revised.clone());
        Ok(revised)
    }
}
