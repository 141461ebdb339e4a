//! 提示词：两个角色的固定前言与各阶段请求模板
//!
//! 前言可由 config/prompts/solver.txt、config/prompts/supervisor.txt 覆盖。

use std::path::Path;

pub const SOLVER_PREAMBLE: &str = "You are a reasoning assistant that solves problems under the guidance of a Supervisor.\n\
Follow the steps the Supervisor defines, break the problem into the components it suggests and weigh every \
perspective it names. Verify each conclusion through explicit reasoning instead of assuming it. Incorporate \
the Supervisor's feedback to improve clarity, logic and depth. Keep answers structured, precise and unbiased.";

pub const SUPERVISOR_PREAMBLE: &str = "You are a Supervisor that oversees the thought process of another model, the Server.\n\
Decompose problems into manageable steps, define the order in which the Server should work, suggest alternative \
perspectives and assess the Server's reasoning with constructive feedback. Stay neutral: never assume a response \
is correct and never give the answer yourself. Always ask what could go wrong, and never rate satisfaction or \
accuracy high on the first reasoning round.";

/// 前言集合（每个会话的两份历史都从这里初始化）
#[derive(Debug, Clone)]
pub struct Preambles {
    pub solver: String,
    pub supervisor: String,
}

impl Default for Preambles {
    fn default() -> Self {
        Self {
            solver: SOLVER_PREAMBLE.to_string(),
            supervisor: SUPERVISOR_PREAMBLE.to_string(),
        }
    }
}

impl Preambles {
    /// 从目录读取 solver.txt / supervisor.txt，缺失的文件使用内置前言
    pub fn load(dir: &Path) -> Self {
        let read = |name: &str, fallback: &str| {
            std::fs::read_to_string(dir.join(name))
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            solver: read("solver.txt", SOLVER_PREAMBLE),
            supervisor: read("supervisor.txt", SUPERVISOR_PREAMBLE),
        }
    }
}

pub fn analysis_request(transcript: &str, user_input: &str) -> String {
    format!(
        "Analyze the following input for the Server and determine:\n\
1. Is this a question or a conversational statement?\n\
2. How complex is it and what type of reasoning fits best?\n\
3. Which different perspectives should be considered?\n\
4. The suggested initial reasoning steps, in order.\n\
5. An extra explanation of what exactly is being asked and how such a prompt is usually answered. \
Do not answer the prompt yourself; break it into smaller parts.\n\n\
--------------- The Server chat is as follows ---------------\n\
{transcript}\n\nuser: \"{user_input}\""
    )
}

pub fn guidance(explanation: &str) -> String {
    format!("consider the guidance from the supervisor: {explanation}")
}

pub fn step_instruction(step: &str) -> String {
    format!(
        "The supervisor suggests the following action for the next step:\n{step}\n\
Provide a clear and concise response that directly addresses this step."
    )
}

pub fn critique_request(transcript: &str) -> String {
    format!(
        "The Server followed your suggested steps and came up with the responses below.\n\n\
Critically analyze the reasoning: highlight logical flaws, hidden assumptions and missing information, \
and give actionable instructions.\n\
Rate accuracy high only if the response cannot be challenged critically and every aspect is considered. \
Rate satisfaction high only if the response shows a clear, logically sound thought process.\n\
Give exact instructions on how to improve the response to reach a better rating.\n\
If the response is still not satisfying or accurate after several refinement rounds, set failure to true.\n\
--------------- The Server chat is as follows ---------------\n\
{transcript}"
    )
}

pub fn refinement_instruction(round: u32, instructions: &str) -> String {
    format!(
        "### Reasoning Step {round}\nI reviewed your responses, here are your instructions:\n\"{instructions}\"\n\
Refine your answer based on the review.\n\n\
Ask yourself: am I missing important information? Are there logical flaws in my reasoning? \
Have I considered all relevant perspectives?\n\
Answer succinctly with only what is required, and do not talk about the supervision process."
    )
}
