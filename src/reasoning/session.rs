//! 推理会话：一次 reasoning-mode 调用的全部状态
//!
//! 独占 Solver / Supervisor 两份历史、轮数与阶段；不跨调用复用，不与其它会话共享。

use serde::Serialize;

use crate::core::ReasoningPhase;
use crate::memory::{ConversationHistory, Role};

/// 各阶段的网关调用计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallCounters {
    pub analysis: u32,
    pub steps: u32,
    pub critiques: u32,
    pub refinements: u32,
    /// 单轮直通调用（降级路径）
    pub plain: u32,
}

impl CallCounters {
    pub fn total(&self) -> u32 {
        self.analysis + self.steps + self.critiques + self.refinements + self.plain
    }
}

#[derive(Debug, Clone)]
pub struct ReasoningSession {
    pub input: String,
    pub solver: ConversationHistory,
    pub supervisor: ConversationHistory,
    round_count: u32,
    phase: ReasoningPhase,
    pub calls: CallCounters,
    /// 创建时 Solver 历史的长度；此前的消息属于之前的对话轮次
    solver_base: usize,
}

impl ReasoningSession {
    pub fn new(
        input: impl Into<String>,
        solver: ConversationHistory,
        supervisor: ConversationHistory,
    ) -> Self {
        Self {
            input: input.into(),
            solver_base: solver.len(),
            solver,
            supervisor,
            round_count: 0,
            phase: ReasoningPhase::Init,
            calls: CallCounters::default(),
        }
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    /// 进入下一轮（轮数只增不减）
    pub fn next_round(&mut self) -> u32 {
        self.round_count += 1;
        self.round_count
    }

    pub fn phase(&self) -> ReasoningPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: ReasoningPhase) {
        self.phase = phase;
    }

    /// 当前候选答案：本次推理追加的最近一条 assistant 消息，没有时取最后一条消息
    pub fn candidate_answer(&self) -> String {
        self.solver
            .messages()
            .get(self.solver_base..)
            .unwrap_or_default()
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .unwrap_or_else(|| self.solver.last())
            .content
            .clone()
    }
}
