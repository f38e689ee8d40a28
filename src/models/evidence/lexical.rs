//! Lexical Resource 证据

use serde::{Deserialize, Serialize};

use super::{count_impeding, Control, Density, Impact, Level, Severity};
use crate::error::{AppError, AppResult};
use crate::models::essay::EssayStructure;

/// 词汇亮点类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightCategory {
    TopicSpecific,
    AttitudeMarker,
    PreciseWording,
    Collocation,
    SophisticatedPhrase,
}

/// 词汇错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexicalErrorType {
    WrongWordChoice,
    CollocationError,
    RegisterInappropriate,
    AwkwardPhrase,
    Spelling,
    WordFormation,
}

/// 词汇范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeLevel {
    Wide,
    Sufficient,
    Limited,
    ExtremelyLimited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedItem {
    pub lemma_or_phrase: String,
    pub count: u32,
    pub example_sids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyHighlight {
    pub sid: String,
    pub span: String,
    pub category: HighlightCategory,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalErrorItem {
    pub sid: String,
    pub span: String,
    pub error_type: LexicalErrorType,
    pub severity: Severity,
    pub impact: Impact,
    pub note: String,
}

/// 描述性汇总（不是分数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalSummaries {
    pub range_level: RangeLevel,
    pub precision_level: Level,
    pub collocation_control: Control,
    pub error_density: Density,
    pub error_impact_overall: Impact,
}

/// LR 证据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalEvidence {
    pub repetition: Vec<RepeatedItem>,
    pub vocabulary_highlights: Vec<VocabularyHighlight>,
    pub lexical_errors: Vec<LexicalErrorItem>,
    pub summaries: LexicalSummaries,
}

impl LexicalEvidence {
    pub fn impeding_error_count(&self) -> usize {
        count_impeding(self.lexical_errors.iter().map(|e| &e.impact))
    }

    pub fn validate(&self, essay: &EssayStructure, label: &str) -> AppResult<()> {
        let checker = essay.checker(label);

        for item in &self.repetition {
            checker.non_empty("lemma_or_phrase", &item.lemma_or_phrase)?;
            if item.example_sids.is_empty() {
                return Err(AppError::invalid_value(
                    label,
                    "repetition.example_sids",
                    format!("'{}' 没有引用任何句子", item.lemma_or_phrase),
                ));
            }
            checker.sids(&item.example_sids)?;
        }
        for highlight in &self.vocabulary_highlights {
            checker.span(&highlight.sid, &highlight.span)?;
        }
        for error in &self.lexical_errors {
            checker.span(&error.sid, &error.span)?;
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
            word_count: 11,
            has_bullets: false,
            paragraphs: vec![Paragraph {
                pid: "P1".to_string(),
                sentences: vec![Sentence {
                    sid: "P1S1".to_string(),
                    text: "Goverment should make a big effort on renewable energy.".to_string(),
                }],
            }],
        }
    }

    fn evidence(span: &str) -> LexicalEvidence {
        serde_json::from_value(serde_json::json!({
            "repetition": [],
            "vocabulary_highlights": [
                {"sid": "P1S1", "span": "renewable energy", "category": "topic_specific", "note": "apt"}
            ],
            "lexical_errors": [
                {"sid": "P1S1", "span": span, "error_type": "spelling", "severity": "minor", "impact": "minimal", "note": "spelling"}
            ],
            "summaries": {
                "range_level": "sufficient",
                "precision_level": "medium",
                "collocation_control": "adequate",
                "error_density": "low",
                "error_impact_overall": "minimal"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_exact_span_passes() {
        assert!(evidence("Goverment").validate(&essay(), "lr").is_ok());
    }

    #[test]
    fn test_corrected_span_is_rejected() {
        let err = evidence("Government").validate(&essay(), "lr").unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn test_impeding_count() {
        let mut ev = evidence("make a big effort");
        assert_eq!(ev.impeding_error_count(), 0);
        ev.lexical_errors[0].impact = Impact::Impedes;
        assert_eq!(ev.impeding_error_count(), 1);
    }
}
