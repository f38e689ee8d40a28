//! 各评分项的证据结构
//!
//! 证据只包含"看到了什么"（sid / span / 分类标签），不包含分数。
//! 所有分类字段都是封闭枚举，越界值在反序列化时即失败。

pub mod coherence;
pub mod grammar;
pub mod lexical;
pub mod task;

use serde::{Deserialize, Serialize};

pub use coherence::{
    CohesionIssue, CohesionIssueType, CohesiveDevice, CoherenceEvidence, DeviceType, FlowClarity,
    ParagraphFunction, ReferenceChain, RhetoricalFunction,
};
pub use grammar::{
    ComplexFeature, GrammarErrorItem, GrammarErrorType, GrammarEvidence, GrammarSummaries,
    PunctuationIssue, PunctuationIssueType, SentenceAnalysis, SentenceType, StructureRange,
};
pub use lexical::{
    HighlightCategory, LexicalErrorItem, LexicalErrorType, LexicalEvidence, LexicalSummaries,
    RangeLevel, RepeatedItem, VocabularyHighlight,
};
pub use task::{
    AccuracyFlag, ArgumentParagraph, CoverageEntry, FeatureParagraph, FeatureType, IdeaRelevance,
    SupportQuality, TaskAchievementEvidence, TaskEvidence, TaskResponseEvidence,
};

/// 问题严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

/// 对理解的影响
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Minimal,
    Some,
    Impedes,
}

/// 三档等级（high / medium / low）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    High,
    Medium,
    Low,
}

/// 错误密度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    Low,
    Medium,
    High,
}

/// 控制程度（strong / adequate / weak）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Strong,
    Adequate,
    Weak,
}

/// 带原因的句子引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceNote {
    pub sid: String,
    pub reason: String,
}

/// 统计"影响理解"的条目数
pub(crate) fn count_impeding<'a>(impacts: impl Iterator<Item = &'a Impact>) -> usize {
    impacts.filter(|i| **i == Impact::Impedes).count()
}
