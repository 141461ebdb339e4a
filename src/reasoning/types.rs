//! Supervisor 结构化输出类型（分析计划与批判评分），同时用于生成 JSON Schema

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 问题复杂度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// 满意度 / 准确度评级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Low,
    Medium,
    High,
}

/// Analysis Stage 产出的计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AnalysisResult {
    /// 输入是问题还是对话性陈述
    pub is_question: bool,
    pub complexity: Complexity,
    /// 推理类型，如 logical / analytical / creative
    pub reasoning_type: String,
    /// 需要考虑的视角
    pub perspectives: Vec<String>,
    /// 按顺序执行的推理步骤
    pub steps: Vec<String>,
    /// 对用户输入的补充说明（不直接作答）
    pub explanation: String,
}

/// Critique Stage 产出的评分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CritiqueResult {
    pub satisfaction: Rating,
    pub accuracy: Rating,
    /// 详细分析与可执行的改进指令
    pub instructions: String,
    /// Supervisor 判定推理无法收敛
    pub failure: bool,
}

impl CritiqueResult {
    /// 准确度与满意度均为 high
    pub fn is_converged(&self) -> bool {
        self.accuracy == Rating::High && self.satisfaction == Rating::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critique_parses_lowercase_ratings() {
        let c: CritiqueResult = serde_json::from_str(
            r#"{"satisfaction":"high","accuracy":"medium","instructions":"add units","failure":false}"#,
        )
        .unwrap();
        assert_eq!(c.satisfaction, Rating::High);
        assert_eq!(c.accuracy, Rating::Medium);
        assert!(!c.is_converged());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let r = serde_json::from_str::<CritiqueResult>(
            r#"{"satisfaction":"high","accuracy":"high","instructions":"","failure":false,"extra":1}"#,
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_analysis_rejects_bad_complexity() {
        let r = serde_json::from_str::<AnalysisResult>(
            r#"{"is_question":true,"complexity":"huge","reasoning_type":"logical","perspectives":[],"steps":[],"explanation":""}"#,
        );
        assert!(r.is_err());
    }
}
