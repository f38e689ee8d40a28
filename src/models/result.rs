use serde::{Deserialize, Serialize};

use super::criterion::{Criterion, WritingTask};
use super::score::PerCriterion;

/// 评分量表标识
pub const SCORE_SCALE: &str = "ielts_writing_band_0_9_v1";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallScore {
    pub overall: f64,
}

/// 跨评分项的综合反馈
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallFeedback {
    pub overall_evaluation: String,
    pub what_you_did_well: Vec<String>,
    pub what_hurt_your_score: Vec<String>,
    pub band7_to_band8_focus: Vec<String>,
}

/// 建议所属的评分项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Task,
    CoherenceAndCohesion,
    LexicalResource,
    Grammar,
}

impl SuggestionCategory {
    pub fn criterion(&self) -> Criterion {
        match self {
            SuggestionCategory::Task => Criterion::TaskResponse,
            SuggestionCategory::CoherenceAndCohesion => Criterion::CoherenceCohesion,
            SuggestionCategory::LexicalResource => Criterion::LexicalResource,
            SuggestionCategory::Grammar => Criterion::Grammar,
        }
    }
}

/// 行内修改建议
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// 原文中的短片段，或对问题的概括描述
    pub original_text: String,
    pub suggested_text: String,
    pub category: SuggestionCategory,
    pub explanation: String,
    pub evidence_sids: Vec<String>,
}

/// 评估元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMeta {
    pub attempt_id: String,
    pub task: WritingTask,
    pub scale: String,
    pub model_version: String,
    /// RFC 3339
    pub evaluated_at: String,
    pub word_count: usize,
}

/// 一次评估的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallResult {
    pub score: OverallScore,
    pub per_criterion: PerCriterion,
    pub overall_feedback: OverallFeedback,
    pub suggestions: Vec<Suggestion>,
    pub meta: EvaluationMeta,
}

/// 范文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEssay {
    pub target_score: f64,
    pub content: String,
    #[serde(default)]
    pub analysis: String,
}
