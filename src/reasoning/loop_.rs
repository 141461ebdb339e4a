//! 收敛控制器主循环
//!
//! Analysis -> 逐步执行 -> {Critique ⇄ Refinement}* -> DONE | FAILED；
//! 支持取消（每次非终止状态转换前检查）、最大轮数限制、拒绝 / Schema 不合法时降级到单轮直通。
//! 可选 event_tx：向前端推送 PhaseChanged / Plan / StepDone / Critique / Refined / Finished。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{AgentError, ReasoningPhase};
use crate::llm::{LlmClient, Structured};
use crate::memory::ConversationHistory;
use crate::reasoning::session::{CallCounters, ReasoningSession};
use crate::reasoning::{prompts, Analyzer, Critic, ReasoningEvent, Refiner, StepExecutor};

/// 默认最大批判轮数
pub const DEFAULT_MAX_ROUNDS: u32 = 8;
/// 事件中回复预览最大字符数
const PREVIEW_CHARS: usize = 200;

/// 会话结束原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// 准确度与满意度均为 high
    Converged,
    /// Supervisor 设置了 failure
    SupervisorFailure,
    /// 达到轮数上限仍未收敛
    RoundLimit { max_rounds: u32 },
    /// 结构化输出被拒绝或不合法，改走单轮直通
    Fallback { reason: String },
}

/// 一次推理的结果
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningOutcome {
    pub answer: String,
    pub phase: ReasoningPhase,
    pub termination: Termination,
    pub rounds: u32,
    pub calls: CallCounters,
}

impl ReasoningOutcome {
    /// 答案是否经过 Supervisor 认可（或本就是直通回答）
    pub fn converged(&self) -> bool {
        matches!(
            self.termination,
            Termination::Converged | Termination::Fallback { .. }
        )
    }
}

fn send_event(tx: Option<&UnboundedSender<ReasoningEvent>>, ev: ReasoningEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

fn preview(text: &str) -> String {
    let p: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", p)
    } else {
        p
    }
}

/// 单轮直通：追加用户输入 → 完成 → 追加回复。服务错误时撤回未回复的输入。
pub async fn plain_completion(
    llm: &dyn LlmClient,
    solver: &mut ConversationHistory,
    user_input: &str,
) -> Result<String, AgentError> {
    solver.push_user(user_input);
    match llm.complete(solver.messages()).await {
        Ok(reply) => {
            solver.push_assistant(reply.clone());
            Ok(reply)
        }
        Err(e) => {
            solver.retract_last_pending()?;
            Err(e.into())
        }
    }
}

/// 收敛控制器：持有四个阶段与 Solver 直通用的 LLM；无会话状态，可被多个会话共享
pub struct ConvergenceController {
    solver_llm: Arc<dyn LlmClient>,
    analyzer: Analyzer,
    executor: StepExecutor,
    critic: Critic,
    refiner: Refiner,
    max_rounds: u32,
}

impl ConvergenceController {
    pub fn new(solver_llm: Arc<dyn LlmClient>, supervisor_llm: Arc<dyn LlmClient>) -> Self {
        Self {
            analyzer: Analyzer::new(supervisor_llm.clone()),
            executor: StepExecutor::new(solver_llm.clone()),
            critic: Critic::new(supervisor_llm),
            refiner: Refiner::new(solver_llm.clone()),
            solver_llm,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// 设置最大轮数（至少 1）
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// 进入非终止阶段：先检查取消
    fn enter(
        &self,
        session: &mut ReasoningSession,
        phase: ReasoningPhase,
        cancel: &CancellationToken,
        event_tx: Option<&UnboundedSender<ReasoningEvent>>,
    ) -> Result<(), AgentError> {
        if cancel.is_cancelled() {
            warn!(phase = ?session.phase(), round = session.round_count(), "reasoning cancelled");
            return Err(AgentError::Cancelled);
        }
        debug!(from = ?session.phase(), to = ?phase, round = session.round_count(), "phase transition");
        session.set_phase(phase);
        send_event(
            event_tx,
            ReasoningEvent::PhaseChanged {
                phase,
                round: session.round_count(),
            },
        );
        Ok(())
    }

    fn finish(
        &self,
        session: &mut ReasoningSession,
        termination: Termination,
        answer: String,
        event_tx: Option<&UnboundedSender<ReasoningEvent>>,
    ) -> ReasoningOutcome {
        let phase = match termination {
            Termination::Converged | Termination::Fallback { .. } => ReasoningPhase::Done,
            Termination::SupervisorFailure | Termination::RoundLimit { .. } => {
                ReasoningPhase::Failed
            }
        };
        session.set_phase(phase);
        let outcome = ReasoningOutcome {
            answer,
            phase,
            termination,
            rounds: session.round_count(),
            calls: session.calls,
        };
        info!(
            phase = ?outcome.phase,
            rounds = outcome.rounds,
            calls = outcome.calls.total(),
            converged = outcome.converged(),
            "reasoning finished"
        );
        send_event(
            event_tx,
            ReasoningEvent::Finished {
                phase,
                rounds: outcome.rounds,
                converged: outcome.converged(),
            },
        );
        outcome
    }

    async fn fall_back(
        &self,
        session: &mut ReasoningSession,
        reason: String,
        event_tx: Option<&UnboundedSender<ReasoningEvent>>,
    ) -> Result<ReasoningOutcome, AgentError> {
        warn!(%reason, "falling back to plain completion");
        send_event(event_tx, ReasoningEvent::Fallback { reason: reason.clone() });
        session.calls.plain += 1;
        let input = session.input.clone();
        let answer = plain_completion(self.solver_llm.as_ref(), &mut session.solver, &input).await?;
        Ok(self.finish(session, Termination::Fallback { reason }, answer, event_tx))
    }

    /// 驱动一次推理会话直到终止
    pub async fn run(
        &self,
        session: &mut ReasoningSession,
        cancel: &CancellationToken,
        event_tx: Option<&UnboundedSender<ReasoningEvent>>,
    ) -> Result<ReasoningOutcome, AgentError> {
        self.enter(session, ReasoningPhase::Analyzing, cancel, event_tx)?;
        session.calls.analysis += 1;
        let analysis = self
            .analyzer
            .analyze(&mut session.supervisor, &session.solver, &session.input)
            .await?;
        let plan = match analysis {
            Structured::Parsed(plan) => plan,
            Structured::Refused(reason) => {
                return self
                    .fall_back(session, format!("analysis refused: {reason}"), event_tx)
                    .await
            }
            Structured::SchemaInvalid(err) => {
                return self
                    .fall_back(session, format!("analysis output invalid: {err}"), event_tx)
                    .await
            }
        };
        send_event(
            event_tx,
            ReasoningEvent::Plan {
                steps: plan.steps.clone(),
                perspectives: plan.perspectives.clone(),
            },
        );

        session.solver.push_user(session.input.clone());
        session.solver.push_user(prompts::guidance(&plan.explanation));

        self.enter(session, ReasoningPhase::ExecutingSteps, cancel, event_tx)?;
        for (index, step) in plan.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            session.calls.steps += 1;
            let response = self.executor.execute_step(&mut session.solver, step).await?;
            send_event(
                event_tx,
                ReasoningEvent::StepDone {
                    index,
                    step: step.clone(),
                    preview: preview(&response),
                },
            );
        }

        loop {
            self.enter(session, ReasoningPhase::Critiquing, cancel, event_tx)?;
            let round = session.next_round();
            session.calls.critiques += 1;
            let critique = match self
                .critic
                .critique(&mut session.supervisor, &session.solver, round)
                .await?
            {
                Structured::Parsed(c) => c,
                Structured::Refused(reason) => {
                    return self
                        .fall_back(session, format!("critique refused: {reason}"), event_tx)
                        .await
                }
                Structured::SchemaInvalid(err) => {
                    return self
                        .fall_back(session, format!("critique output invalid: {err}"), event_tx)
                        .await
                }
            };
            send_event(
                event_tx,
                ReasoningEvent::Critique {
                    round,
                    accuracy: critique.accuracy,
                    satisfaction: critique.satisfaction,
                    failure: critique.failure,
                },
            );

            if critique.failure {
                let answer = session.candidate_answer();
                return Ok(self.finish(session, Termination::SupervisorFailure, answer, event_tx));
            }
            if critique.is_converged() {
                let answer = session.candidate_answer();
                return Ok(self.finish(session, Termination::Converged, answer, event_tx));
            }
            if round >= self.max_rounds {
                let answer = session.candidate_answer();
                let termination = Termination::RoundLimit {
                    max_rounds: self.max_rounds,
                };
                return Ok(self.finish(session, termination, answer, event_tx));
            }

            self.enter(session, ReasoningPhase::Refining, cancel, event_tx)?;
            session.calls.refinements += 1;
            let revised = self
                .refiner
                .refine(&mut session.solver, &critique.instructions, round)
                .await?;
            send_event(
                event_tx,
                ReasoningEvent::Refined {
                    round,
                    preview: preview(&revised),
                },
            );
        }
    }
}
