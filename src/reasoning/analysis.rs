//! Analysis Stage：请 Supervisor 把用户输入分解为结构化计划
//!
//! 请求嵌入 Solver 当前对话全文；成功时 Supervisor 历史前进一对 request / response，
//! 拒绝或 Schema 不合法时只保留已追加的请求，不再修改 Supervisor 历史。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{complete_typed, LlmClient, LlmError, OutputSchema, Structured};
use crate::memory::ConversationHistory;
use crate::reasoning::prompts;
use crate::reasoning::types::AnalysisResult;

pub const ANALYSIS_SCHEMA: &str = "analysis";

/// Analyzer：持有 Supervisor 的 LLM 与计划 Schema
pub struct Analyzer {
    llm: Arc<dyn LlmClient>,
    schema: OutputSchema,
}

impl Analyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            schema: OutputSchema::of::<AnalysisResult>(ANALYSIS_SCHEMA),
        }
    }

    pub async fn analyze(
        &self,
        supervisor: &mut ConversationHistory,
        solver: &ConversationHistory,
        user_input: &str,
    ) -> Result<Structured<AnalysisResult>, LlmError> {
        supervisor.push_user(prompts::analysis_request(&solver.transcript(), user_input));

        let result =
            complete_typed::<AnalysisResult>(self.llm.as_ref(), supervisor.messages(), &self.schema)
                .await?;

        match &result {
            Structured::Parsed(plan) => {
                debug!(
                    steps = plan.steps.len(),
                    complexity = ?plan.complexity,
                    reasoning_type = %plan.reasoning_type,
                    "analysis produced a plan"
                );
                let raw = serde_json::to_string(plan).unwrap_or_default();
                supervisor.push_assistant(raw);
            }
            Structured::Refused(reason) => warn!(%reason, "supervisor refused analysis"),
            Structured::SchemaInvalid(err) => warn!(%err, "analysis output failed validation"),
        }
        Ok(result)
    }
}
