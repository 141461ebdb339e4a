//! Critique Stage：Supervisor 对 Solver 累积对话评分
//!
//! 发请求前撤回 Supervisor 历史尾部尚未回复的上一轮批判请求，避免指令文本逐轮堆叠；
//! 评分以结构化结果返回给控制器，本轮请求留在尾部，由下一轮撤回。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::AgentError;
use crate::llm::{complete_typed, LlmClient, OutputSchema, Structured};
use crate::memory::ConversationHistory;
use crate::reasoning::prompts;
use crate::reasoning::types::CritiqueResult;

pub const CRITIQUE_SCHEMA: &str = "critique";

/// Critic：持有 Supervisor 的 LLM 与评分 Schema
pub struct Critic {
    llm: Arc<dyn LlmClient>,
    schema: OutputSchema,
}

impl Critic {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            schema: OutputSchema::of::<CritiqueResult>(CRITIQUE_SCHEMA),
        }
    }

    pub async fn critique(
        &self,
        supervisor: &mut ConversationHistory,
        solver: &ConversationHistory,
        round: u32,
    ) -> Result<Structured<CritiqueResult>, AgentError> {
        if supervisor.has_pending() {
            supervisor.retract_last_pending()?;
        }
        supervisor.push_user(prompts::critique_request(&solver.transcript()));

        let result =
            complete_typed::<CritiqueResult>(self.llm.as_ref(), supervisor.messages(), &self.schema)
                .await?;

        match &result {
            Structured::Parsed(c) => debug!(
                round,
                accuracy = ?c.accuracy,
                satisfaction = ?c.satisfaction,
                failure = c.failure,
                "critique received"
            ),
            Structured::Refused(reason) => warn!(round, %reason, "supervisor refused critique"),
            Structured::SchemaInvalid(err) => {
                warn!(round, %err, "critique output failed validation")
            }
        }
        Ok(result)
    }
}
