//! Grammatical Range and Accuracy 证据

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{count_impeding, Control, Density, Impact, Level, Severity};
use crate::error::{AppError, AppResult};
use crate::models::essay::EssayStructure;

/// 句子结构类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceType {
    Simple,
    Compound,
    Complex,
    CompoundComplex,
    FragmentOrFaulty,
}

/// 复杂结构特征
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexFeature {
    SubordinateClause,
    RelativeClause,
    Conditional,
    Passive,
    ParticipleClause,
    Nominalisation,
    Coordination,
    AdvancedPunctuation,
}

/// 语法错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarErrorType {
    #[serde(rename = "SVA")]
    Sva,
    Tense,
    Article,
    Preposition,
    Pronoun,
    Agreement,
    WordOrder,
    MissingWord,
    ExtraWord,
    Fragment,
    RunOn,
    Parallelism,
    Other,
}

/// 标点问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunctuationIssueType {
    CommaSplice,
    MissingComma,
    UnnecessaryComma,
    Apostrophe,
    Capitalization,
    SentenceBoundary,
    Other,
}

/// 句型范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureRange {
    Wide,
    Moderate,
    Limited,
    VeryLimited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceAnalysis {
    pub sid: String,
    pub sentence_type: SentenceType,
    pub complex_features: Vec<ComplexFeature>,
    pub is_error_free: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarErrorItem {
    pub sid: String,
    pub span: String,
    pub error_type: GrammarErrorType,
    pub severity: Severity,
    pub impact: Impact,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunctuationIssue {
    pub sid: String,
    pub span: String,
    pub issue_type: PunctuationIssueType,
    pub severity: Severity,
    pub impact: Impact,
    pub note: String,
}

/// 描述性汇总（不是分数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarSummaries {
    pub structure_range: StructureRange,
    pub complex_sentence_share: Level,
    pub error_density: Density,
    pub error_impact_overall: Impact,
    pub punctuation_control: Control,
}

/// GRA 证据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarEvidence {
    pub sentence_analysis: Vec<SentenceAnalysis>,
    pub grammar_errors: Vec<GrammarErrorItem>,
    pub punctuation_issues: Vec<PunctuationIssue>,
    pub summaries: GrammarSummaries,
}

impl GrammarEvidence {
    pub fn impeding_error_count(&self) -> usize {
        count_impeding(
            self.grammar_errors
                .iter()
                .map(|e| &e.impact)
                .chain(self.punctuation_issues.iter().map(|p| &p.impact)),
        )
    }

    /// 校验引用，并要求每个句子都有结构分析
    pub fn validate(&self, essay: &EssayStructure, label: &str) -> AppResult<()> {
        let checker = essay.checker(label);

        let mut analysed = HashSet::new();
        for analysis in &self.sentence_analysis {
            checker.sid(&analysis.sid)?;
            analysed.insert(analysis.sid.as_str());
        }
        if let Some(missing) = essay.sentences().find(|s| !analysed.contains(s.sid.as_str())) {
            return Err(AppError::invalid_value(
                label,
                "sentence_analysis",
                format!("句子 {} 没有结构分析", missing.sid),
            ));
        }

        for error in &self.grammar_errors {
            checker.span(&error.sid, &error.span)?;
        }
        for issue in &self.punctuation_issues {
            checker.span(&issue.sid, &issue.span)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::essay::{Paragraph, Sentence};

    fn essay() -> EssayStructure {
        EssayStructure {
            word_count: 10,
            has_bullets: false,
            paragraphs: vec![Paragraph {
                pid: "P1".to_string(),
                sentences: vec![
                    Sentence {
                        sid: "P1S1".to_string(),
                        text: "People needs more parks.".to_string(),
                    },
                    Sentence {
                        sid: "P1S2".to_string(),
                        text: "Although costly, they help.".to_string(),
                    },
                ],
            }],
        }
    }

    fn evidence() -> GrammarEvidence {
        serde_json::from_value(serde_json::json!({
            "sentence_analysis": [
                {"sid": "P1S1", "sentence_type": "simple", "complex_features": [], "is_error_free": false},
                {"sid": "P1S2", "sentence_type": "complex", "complex_features": ["subordinate_clause"], "is_error_free": true}
            ],
            "grammar_errors": [
                {"sid": "P1S1", "span": "People needs", "error_type": "SVA", "severity": "moderate", "impact": "some", "note": "agreement"}
            ],
            "punctuation_issues": [],
            "summaries": {
                "structure_range": "moderate",
                "complex_sentence_share": "medium",
                "error_density": "medium",
                "error_impact_overall": "some",
                "punctuation_control": "adequate"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_evidence_passes() {
        let ev = evidence();
        assert!(ev.validate(&essay(), "gra").is_ok());
        assert_eq!(ev.grammar_errors[0].error_type, GrammarErrorType::Sva);
    }

    #[test]
    fn test_every_sentence_must_be_analysed() {
        let mut ev = evidence();
        ev.sentence_analysis.truncate(1);
        assert!(ev.validate(&essay(), "gra").is_err());
    }

    #[test]
    fn test_impeding_counts_punctuation_too() {
        let mut ev = evidence();
        ev.punctuation_issues.push(PunctuationIssue {
            sid: "P1S2".to_string(),
            span: "costly,".to_string(),
            issue_type: PunctuationIssueType::Other,
            severity: Severity::Major,
            impact: Impact::Impedes,
            note: "boundary".to_string(),
        });
        ev.grammar_errors[0].impact = Impact::Impedes;
        assert_eq!(ev.impeding_error_count(), 2);
    }
}
