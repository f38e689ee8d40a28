//! Coherence and Cohesion 证据

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Severity;
use crate::error::{AppError, AppResult};
use crate::models::essay::EssayStructure;

/// 段落的修辞功能
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhetoricalFunction {
    Thesis,
    Reason,
    Example,
    Result,
    Concession,
    Contrast,
    Addition,
    Conclusion,
    Background,
    Unknown,
}

/// 衔接手段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Connector,
    DiscourseMarker,
    Reference,
    Substitution,
}

/// 连贯问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohesionIssueType {
    MissingLink,
    JumpInLogic,
    WeakParagraphing,
    UnclearReference,
    MisusedConnector,
    OverusedConnector,
    MechanicalLinking,
}

impl CohesionIssueType {
    /// 连接词误用 / 指代不清类问题
    pub fn is_connector_or_reference(&self) -> bool {
        matches!(
            self,
            CohesionIssueType::UnclearReference
                | CohesionIssueType::MisusedConnector
                | CohesionIssueType::OverusedConnector
                | CohesionIssueType::MechanicalLinking
        )
    }
}

/// 整体行文流畅度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowClarity {
    Clear,
    MostlyClear,
    Mixed,
    Unclear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphFunction {
    pub pid: String,
    pub function: RhetoricalFunction,
    pub main_point_sid: Option<String>,
    #[serde(default)]
    pub link_from_prev: Option<String>,
    pub transition_sids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohesiveDevice {
    pub sid: String,
    pub device: String,
    pub device_type: DeviceType,
    #[serde(default)]
    pub role: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceChain {
    pub entity: String,
    pub sids: Vec<String>,
    pub ok: bool,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohesionIssue {
    pub sid: String,
    pub issue_type: CohesionIssueType,
    pub severity: Severity,
    pub note: String,
}

/// CC 证据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherenceEvidence {
    pub paragraph_functions: Vec<ParagraphFunction>,
    pub cohesive_devices: Vec<CohesiveDevice>,
    pub reference_chains: Vec<ReferenceChain>,
    pub issues: Vec<CohesionIssue>,
    pub overall_flow: FlowClarity,
}

impl CoherenceEvidence {
    pub fn major_issue_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Major)
            .count()
    }

    pub fn connector_or_reference_issue_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.issue_type.is_connector_or_reference())
            .count()
    }

    /// 校验引用
    ///
    /// 每个段落必须恰好被标注一次；被判为不当的衔接手段必须说明原因。
    pub fn validate(&self, essay: &EssayStructure, label: &str) -> AppResult<()> {
        let checker = essay.checker(label);

        let mut labelled = HashSet::new();
        for function in &self.paragraph_functions {
            let paragraph = checker.pid(&function.pid)?;
            if !labelled.insert(function.pid.as_str()) {
                return Err(AppError::invalid_value(
                    label,
                    "paragraph_functions",
                    format!("段落 {} 被重复标注", function.pid),
                ));
            }
            if let Some(sid) = function.main_point_sid.as_deref() {
                checker.sid(sid)?;
                if !paragraph.sentences.iter().any(|s| s.sid == sid) {
                    return Err(AppError::invalid_value(
                        label,
                        "main_point_sid",
                        format!("{} 不属于段落 {}", sid, function.pid),
                    ));
                }
            }
            checker.sids(&function.transition_sids)?;
        }
        if let Some(missing) = essay
            .paragraphs
            .iter()
            .find(|p| !labelled.contains(p.pid.as_str()))
        {
            return Err(AppError::invalid_value(
                label,
                "paragraph_functions",
                format!("段落 {} 没有功能标注", missing.pid),
            ));
        }

        for device in &self.cohesive_devices {
            checker.sid(&device.sid)?;
            checker.non_empty("device", &device.device)?;
            let has_note = device.note.as_deref().is_some_and(|n| !n.trim().is_empty());
            if !device.ok && !has_note {
                return Err(AppError::invalid_value(
                    label,
                    "cohesive_devices.note",
                    format!("{} 中的 '{}' 被判为不当但没有说明原因", device.sid, device.device),
                ));
            }
        }

        if self.reference_chains.len() > 4 {
            warn!(
                "{}: 指代链数量 {} 超过 4 条，仅作提示",
                label,
                self.reference_chains.len()
            );
        }
        for chain in &self.reference_chains {
            checker.non_empty("entity", &chain.entity)?;
            checker.sids(&chain.sids)?;
        }

        for issue in &self.issues {
            checker.sid(&issue.sid)?;
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
            word_count: 12,
            has_bullets: false,
            paragraphs: vec![
                Paragraph {
                    pid: "P1".to_string(),
                    sentences: vec![Sentence {
                        sid: "P1S1".to_string(),
                        text: "Tourism is growing.".to_string(),
                    }],
                },
                Paragraph {
                    pid: "P2".to_string(),
                    sentences: vec![Sentence {
                        sid: "P2S1".to_string(),
                        text: "However, this harms locals.".to_string(),
                    }],
                },
            ],
        }
    }

    fn evidence() -> CoherenceEvidence {
        serde_json::from_value(serde_json::json!({
            "paragraph_functions": [
                {"pid": "P1", "function": "thesis", "main_point_sid": "P1S1", "link_from_prev": null, "transition_sids": []},
                {"pid": "P2", "function": "contrast", "main_point_sid": "P2S1", "transition_sids": ["P2S1"]}
            ],
            "cohesive_devices": [
                {"sid": "P2S1", "device": "however", "device_type": "connector", "role": "contrast", "ok": true, "note": null}
            ],
            "reference_chains": [
                {"entity": "tourism", "sids": ["P1S1", "P2S1"], "ok": false, "note": "'this' is vague"}
            ],
            "issues": [
                {"sid": "P2S1", "issue_type": "unclear_reference", "severity": "minor", "note": "'this' unclear"}
            ],
            "overall_flow": "mostly_clear"
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_evidence_passes() {
        let ev = evidence();
        assert!(ev.validate(&essay(), "cc").is_ok());
        assert_eq!(ev.connector_or_reference_issue_count(), 1);
        assert_eq!(ev.major_issue_count(), 0);
    }

    #[test]
    fn test_unlabelled_paragraph_is_violation() {
        let mut ev = evidence();
        ev.paragraph_functions.pop();
        let err = ev.validate(&essay(), "cc").unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn test_misused_device_requires_note() {
        let mut ev = evidence();
        ev.cohesive_devices[0].ok = false;
        assert!(ev.validate(&essay(), "cc").is_err());
        ev.cohesive_devices[0].note = Some("contrast not signalled".to_string());
        assert!(ev.validate(&essay(), "cc").is_ok());
    }

    #[test]
    fn test_unknown_flow_value_rejected() {
        let raw = serde_json::json!("somewhat_clear");
        assert!(serde_json::from_value::<FlowClarity>(raw).is_err());
    }
}
