//! 状态定义：收敛控制器的阶段

use serde::Serialize;

/// 推理会话阶段：INIT → ANALYZING → EXECUTING_STEPS → CRITIQUING ⇄ REFINING → DONE | FAILED
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningPhase {
    Init,
    Analyzing,
    ExecutingSteps,
    Critiquing,
    Refining,
    Done,
    Failed,
}

impl ReasoningPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReasoningPhase::Done | ReasoningPhase::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(ReasoningPhase::Done.is_terminal());
        assert!(ReasoningPhase::Failed.is_terminal());
        assert!(!ReasoningPhase::Refining.is_terminal());
        assert_eq!(
            serde_json::to_value(ReasoningPhase::ExecutingSteps).unwrap(),
            "executing_steps"
        );
    }
}
