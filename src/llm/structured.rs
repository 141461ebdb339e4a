//! 结构化输出契约（schemars 自动生成 JSON Schema）
//!
//! 网关层只返回原始内容或拒绝（StructuredReply）；complete_typed 负责按目标类型解析，
//! 得到三分支的 Structured<T>，调用方必须显式处理 Parsed / SchemaInvalid / Refused。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::llm::{LlmClient, LlmError};
use crate::memory::Message;

/// 发给服务端的 Schema 描述（名称 + JSON Schema）
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// 从 Rust 类型派生 Schema；子 Schema 内联，不输出 $schema / definitions
    pub fn of<T: JsonSchema>(name: &str) -> Self {
        let settings = SchemaSettings::draft07().with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        });
        let root = settings.into_generator().into_root_schema_for::<T>();
        Self {
            name: name.to_string(),
            schema: serde_json::to_value(&root).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// 网关结构化调用的原始结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredReply {
    /// 模型产出的 JSON 文本（尚未校验）
    Content(String),
    /// 服务端明确拒绝产出结构化结果
    Refusal(String),
}

/// 解析后的结构化结果
#[derive(Debug, Clone, PartialEq)]
pub enum Structured<T> {
    Parsed(T),
    /// 内容无法按 Schema 解析（附错误描述）
    SchemaInvalid(String),
    Refused(String),
}

/// 从文本中提取 JSON（```json ... ``` 代码块或首个 `{` 到末个 `}`）
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// 按 Schema 解析原始回复
pub fn parse_reply<T: DeserializeOwned>(reply: StructuredReply) -> Structured<T> {
    match reply {
        StructuredReply::Refusal(reason) => Structured::Refused(reason),
        StructuredReply::Content(raw) => match serde_json::from_str::<T>(extract_json(&raw)) {
            Ok(v) => Structured::Parsed(v),
            Err(e) => {
                warn!(error = %e, "structured output failed schema validation");
                Structured::SchemaInvalid(format!("{}: {}", e, raw))
            }
        },
    }
}

/// 发起结构化调用并解析为目标类型
pub async fn complete_typed<T>(
    llm: &dyn LlmClient,
    messages: &[Message],
    schema: &OutputSchema,
) -> Result<Structured<T>, LlmError>
where
    T: DeserializeOwned,
{
    let reply = llm.complete_structured(messages, schema).await?;
    Ok(parse_reply(reply))
}
