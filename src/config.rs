//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `OVERSEER__*` 覆盖（双下划线表示嵌套，如 `OVERSEER__REASONING__MAX_ROUNDS=5`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::llm::{RetryConfig, DEFAULT_SOLVER_MODEL, DEFAULT_SUPERVISOR_MODEL, OPENROUTER_BASE_URL};
use crate::reasoning::DEFAULT_MAX_ROUNDS;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub reasoning: ReasoningSection,
    pub prompts: PromptsSection,
}

/// [llm] 段：端点、两个角色的模型、API Key 来源、超时与重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub solver_model: String,
    pub supervisor_model: String,
    /// 读取 API Key 的环境变量名；未设置时依次尝试 API_KEY / OPENROUTER_API_KEY / OPENAI_API_KEY
    pub api_key_env: Option<String>,
    pub timeouts: LlmTimeoutsSection,
    pub retry: LlmRetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: OPENROUTER_BASE_URL.to_string(),
            solver_model: DEFAULT_SOLVER_MODEL.to_string(),
            supervisor_model: DEFAULT_SUPERVISOR_MODEL.to_string(),
            api_key_env: None,
            timeouts: LlmTimeoutsSection::default(),
            retry: LlmRetrySection::default(),
        }
    }
}

impl LlmSection {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            initial_backoff_ms: self.retry.initial_backoff_ms,
            max_backoff_ms: self.retry.max_backoff_ms,
            request_timeout: Duration::from_secs(self.timeouts.request),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次网关调用超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmRetrySection {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for LlmRetrySection {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

/// [reasoning] 段：最大批判轮数、新会话是否默认开启推理模式
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReasoningSection {
    pub max_rounds: u32,
    pub enabled_by_default: bool,
}

impl Default for ReasoningSection {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            enabled_by_default: false,
        }
    }
}

/// [prompts] 段：前言覆盖文件所在目录（solver.txt / supervisor.txt）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PromptsSection {
    pub dir: Option<PathBuf>,
}

/// 从 config 目录加载配置，环境变量 OVERSEER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 OVERSEER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("OVERSEER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
