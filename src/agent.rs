//! Headless 聊天运行时
//!
//! 供任意前端（REPL、WebSocket、HTTP）调用的无界面逻辑：
//! create_agent_components 按配置构建 Solver / Supervisor 两个 LLM 与收敛控制器（多会话共享），
//! ChatSession 保存单个会话独占的两份历史与推理开关，
//! process_input 在推理关闭时直通一次 LLM，开启时跑收敛控制器。

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn, Instrument};

use crate::config::{load_config, AppConfig};
use crate::core::{AgentError, FailureDescriptor, SessionSupervisor};
use crate::llm::{create_openrouter_client, resolve_api_key, LlmClient, RetryingLlmClient};
use crate::memory::ConversationHistory;
use crate::reasoning::{
    plain_completion, ConvergenceController, Preambles, ReasoningEvent, ReasoningOutcome,
    ReasoningSession, Termination,
};

/// 预构建的组件：两个角色的 LLM、控制器与前言，可多会话共享
pub struct AgentComponents {
    pub solver_llm: Arc<dyn LlmClient>,
    pub controller: ConvergenceController,
    pub preambles: Preambles,
    /// 新会话是否默认开启推理模式
    pub reasoning_by_default: bool,
}

impl AgentComponents {
    pub fn new(
        solver_llm: Arc<dyn LlmClient>,
        supervisor_llm: Arc<dyn LlmClient>,
        preambles: Preambles,
        max_rounds: u32,
    ) -> Self {
        Self {
            controller: ConvergenceController::new(solver_llm.clone(), supervisor_llm)
                .with_max_rounds(max_rounds),
            solver_llm,
            preambles,
            reasoning_by_default: false,
        }
    }

    pub fn new_session(&self) -> ChatSession {
        let mut session = ChatSession::new(&self.preambles);
        session.reasoning_enabled = self.reasoning_by_default;
        session
    }
}

/// 按配置创建组件：OpenRouter 兼容客户端外包一层超时 + 重试
pub fn create_agent_components(cfg: &AppConfig) -> AgentComponents {
    let api_key = resolve_api_key(cfg.llm.api_key_env.as_deref());
    if api_key.is_none() {
        warn!("no API key found in environment, requests will be rejected by the service");
    }
    let retry = cfg.llm.retry_config();
    let build = |model: &str| -> Arc<dyn LlmClient> {
        let client =
            create_openrouter_client(Some(&cfg.llm.base_url), model, api_key.as_deref());
        Arc::new(RetryingLlmClient::new(Arc::new(client), retry.clone()))
    };

    let preambles = cfg
        .prompts
        .dir
        .as_deref()
        .map(Preambles::load)
        .unwrap_or_else(|| {
            ["config/prompts", "../config/prompts"]
                .into_iter()
                .map(PathBuf::from)
                .find(|p| p.is_dir())
                .map(|p| Preambles::load(&p))
                .unwrap_or_default()
        });

    let mut components = AgentComponents::new(
        build(&cfg.llm.solver_model),
        build(&cfg.llm.supervisor_model),
        preambles,
        cfg.reasoning.max_rounds,
    );
    components.reasoning_by_default = cfg.reasoning.enabled_by_default;
    components
}

/// 从磁盘与环境变量加载配置并创建组件
pub fn create_agent_components_from_env(
    config_path: Option<PathBuf>,
) -> Result<AgentComponents, AgentError> {
    let cfg = load_config(config_path).map_err(|e| AgentError::Config(e.to_string()))?;
    Ok(create_agent_components(&cfg))
}

/// 单个聊天会话的状态：独占的 Solver / Supervisor 历史、推理开关、取消监管
#[derive(Debug)]
pub struct ChatSession {
    pub id: String,
    pub solver: ConversationHistory,
    pub supervisor: ConversationHistory,
    reasoning_enabled: bool,
    supervisor_control: SessionSupervisor,
}

impl ChatSession {
    pub fn new(preambles: &Preambles) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            solver: ConversationHistory::new(preambles.solver.clone()),
            supervisor: ConversationHistory::new(preambles.supervisor.clone()),
            reasoning_enabled: false,
            supervisor_control: SessionSupervisor::new(),
        }
    }

    pub fn reasoning_enabled(&self) -> bool {
        self.reasoning_enabled
    }

    /// 取消当前正在运行的推理（在下一次状态转换时生效）
    pub fn cancel(&self) {
        self.supervisor_control.cancel();
    }

    /// 上一次输入被取消时换新的取消令牌
    pub fn rearm(&mut self) {
        self.supervisor_control.rearm();
    }

    /// 供其它任务持有的取消句柄；在 rearm 之后获取才能作用于下一次输入
    pub fn cancel_token(&self) -> tokio_util::sync::CancellationToken {
        self.supervisor_control.cancel_token()
    }
}

/// 截断两份历史到各自前言
pub fn reset_session(session: &mut ChatSession) {
    session.solver.reset();
    session.supervisor.reset();
    info!(session_id = %session.id, "session reset");
}

/// 切换推理模式并返回新状态
pub fn toggle_reasoning(session: &mut ChatSession) -> bool {
    session.reasoning_enabled = !session.reasoning_enabled;
    info!(session_id = %session.id, enabled = session.reasoning_enabled, "reasoning toggled");
    session.reasoning_enabled
}

/// 交给传输层的回复：答案、降级答案或类型化失败，永远不是异常文本
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Answer { text: String },
    /// 推理未收敛（Supervisor 判定失败或达到轮数上限），附最后的候选答案
    Degraded { text: String, termination: Termination },
    Failure(FailureDescriptor),
}

impl Reply {
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Answer { text } | Reply::Degraded { text, .. } => Some(text.as_str()),
            Reply::Failure(_) => None,
        }
    }

    fn from_outcome(outcome: ReasoningOutcome) -> Self {
        if outcome.converged() {
            Reply::Answer {
                text: outcome.answer,
            }
        } else {
            Reply::Degraded {
                text: outcome.answer,
                termination: outcome.termination,
            }
        }
    }
}

/// 跑一次推理会话：从会话历史复制出本次调用独占的两份历史，结束后把输入与最终答案记入 Solver 历史
pub async fn run_reasoning(
    components: &AgentComponents,
    session: &mut ChatSession,
    user_text: &str,
    event_tx: Option<&mpsc::UnboundedSender<ReasoningEvent>>,
) -> Result<ReasoningOutcome, AgentError> {
    session.supervisor_control.rearm();
    let cancel = session.supervisor_control.child_token();
    let mut reasoning = ReasoningSession::new(
        user_text,
        session.solver.clone(),
        session.supervisor.clone(),
    );
    let outcome = components
        .controller
        .run(&mut reasoning, &cancel, event_tx)
        .await?;
    session.solver.push_user(user_text);
    session.solver.push_assistant(outcome.answer.clone());
    Ok(outcome)
}

/// 处理单条用户输入；reasoning_enabled 为 false 时只做一次直通调用
pub async fn process_input(
    components: &AgentComponents,
    session: &mut ChatSession,
    user_text: &str,
    reasoning_enabled: bool,
) -> Reply {
    process_input_stream(components, session, user_text, reasoning_enabled, None).await
}

/// 同 process_input，额外通过 event_tx 推送推理过程事件
pub async fn process_input_stream(
    components: &AgentComponents,
    session: &mut ChatSession,
    user_text: &str,
    reasoning_enabled: bool,
    event_tx: Option<&mpsc::UnboundedSender<ReasoningEvent>>,
) -> Reply {
    let span = tracing::info_span!("input", session_id = %session.id, reasoning = reasoning_enabled);
    async {
        let result = if reasoning_enabled {
            run_reasoning(components, session, user_text, event_tx)
                .await
                .map(Reply::from_outcome)
        } else {
            plain_completion(components.solver_llm.as_ref(), &mut session.solver, user_text)
                .await
                .map(|text| Reply::Answer { text })
        };
        result.unwrap_or_else(|e| {
            warn!(error = %e, "input processing failed");
            Reply::Failure(e.to_failure())
        })
    }
    .instrument(span)
    .await
}

/// 同 process_input_stream，处理期间从 interrupts 收到信号即取消本次输入（不退出会话）
pub async fn process_input_interruptible(
    components: &AgentComponents,
    session: &mut ChatSession,
    user_text: &str,
    reasoning_enabled: bool,
    event_tx: Option<&mpsc::UnboundedSender<ReasoningEvent>>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> Reply {
    session.rearm();
    let cancel = session.cancel_token();
    let work = process_input_stream(components, session, user_text, reasoning_enabled, event_tx);
    tokio::pin!(work);
    loop {
        tokio::select! {
            reply = &mut work => return reply,
            Some(()) = interrupts.recv() => {
                info!("interrupt received, cancelling current input");
                cancel.cancel();
            }
        }
    }
}
