//! 推理过程事件：用于流式/SSE 展示阶段切换、计划、步骤、批判与修订

use serde::Serialize;

use crate::core::ReasoningPhase;
use crate::reasoning::types::Rating;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasoningEvent {
    /// 阶段切换
    PhaseChanged { phase: ReasoningPhase, round: u32 },
    /// Supervisor 给出的计划
    Plan { steps: Vec<String>, perspectives: Vec<String> },
    /// 某一步执行完成（回复预览）
    StepDone { index: usize, step: String, preview: String },
    /// 批判评分
    Critique {
        round: u32,
        accuracy: Rating,
        satisfaction: Rating,
        failure: bool,
    },
    /// Solver 修订后的答案预览
    Refined { round: u32, preview: String },
    /// 降级到单轮直通路径
    Fallback { reason: String },
    /// 会话结束
    Finished { phase: ReasoningPhase, rounds: u32, converged: bool },
}
