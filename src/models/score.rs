use serde::{Deserialize, Serialize};

use super::criterion::Criterion;

/// 评分项反馈（固定形状：2 个优点、1 个不足、1 个下一步）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionFeedback {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub next_step: String,
}

/// 单个评分项的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    /// 0.0–9.0，0.5 的整数倍
    pub band: f64,
    /// "1".."9"
    pub band_anchor: String,
    pub feedback: CriterionFeedback,
    /// 生效的封顶规则（空表示没有被封顶）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caps_applied: Vec<String>,
}

/// 四个评分项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCriterion {
    pub task_response: CriterionScore,
    pub coherence_cohesion: CriterionScore,
    pub lexical_resource: CriterionScore,
    pub grammar: CriterionScore,
}

impl PerCriterion {
    pub fn bands(&self) -> [f64; 4] {
        [
            self.task_response.band,
            self.coherence_cohesion.band,
            self.lexical_resource.band,
            self.grammar.band,
        ]
    }

    pub fn get(&self, criterion: Criterion) -> &CriterionScore {
        match criterion {
            Criterion::TaskResponse => &self.task_response,
            Criterion::CoherenceCohesion => &self.coherence_cohesion,
            Criterion::LexicalResource => &self.lexical_resource,
            Criterion::Grammar => &self.grammar,
        }
    }
}
