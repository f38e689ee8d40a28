//! Coherence and Cohesion

use super::{
    gates_section, labelled_sections, score_user_message, CriterionStage, EVIDENCE_RULES,
    SCORER_OUTPUT_RULES,
};
use crate::clients::ChatMessage;
use crate::error::AppResult;
use crate::models::evidence::CoherenceEvidence;
use crate::models::{Criterion, EssayStructure, WritingTask};
use crate::scoring::gates::coherence_gates;
use crate::scoring::Gate;
use crate::services::json_contract::{parse_llm_json, to_prompt_json};

const EVIDENCE_GUIDE: &str = r#"You are an IELTS Writing examiner focusing ONLY on COHERENCE AND COHESION (CC).
Do NOT evaluate task response, vocabulary or grammar.

INPUT: essay_structure JSON (paragraphs with pid, sentences with sid and text)

WHAT TO EXTRACT:
A) paragraph_functions: EXACTLY one entry per paragraph, in order:
   - pid
   - function: one of [thesis, reason, example, result, concession, contrast, addition, conclusion, background, unknown]
   - main_point_sid: the sid in that paragraph carrying its main point, or null
   - link_from_prev: short description of how it links to the previous paragraph, or null
   - transition_sids: sids containing the transition into this paragraph
B) cohesive_devices: connectors, discourse markers, references and substitutions worth noting:
   {"sid", "device" (exact words), "device_type": connector|discourse_marker|reference|substitution,
    "role" (e.g. contrast, cause, addition), "ok": true/false, "note" (REQUIRED when ok is false)}
C) reference_chains: track 2-4 key entities across sentences:
   {"entity", "sids", "ok": true if every reference is unambiguous, "note"}
D) issues: {"sid", "issue_type", "severity": minor|moderate|major, "note"}
   issue_type one of [missing_link, jump_in_logic, weak_paragraphing, unclear_reference,
   misused_connector, overused_connector, mechanical_linking]
E) overall_flow: one of [clear, mostly_clear, mixed, unclear]

OUTPUT schema:
{
    "paragraph_functions": [
        {"pid": "P1", "function": "thesis", "main_point_sid": "P1S2", "link_from_prev": null, "transition_sids": []}
    ],
    "cohesive_devices": [
        {"sid": "P2S1", "device": "Firstly", "device_type": "connector", "role": "sequence", "ok": true, "note": null}
    ],
    "reference_chains": [
        {"entity": "public transport", "sids": ["P1S1", "P2S3"], "ok": true, "note": null}
    ],
    "issues": [
        {"sid": "P3S2", "issue_type": "jump_in_logic", "severity": "moderate", "note": "string"}
    ],
    "overall_flow": "mostly_clear"
}"#;

const ANCHORS: &str = r#"You are an IELTS Writing examiner scoring ONLY COHERENCE AND COHESION (CC).
Base your judgment ONLY on format_fields and auditable_evidence. Do NOT invent evidence.

BAND ANCHORS (operational signals from the evidence):
Band 9: message followed effortlessly; cohesion rarely attracts attention. overall_flow=clear; issues rare and minor; devices and reference chains clear.
Band 8: ideas logically sequenced; cohesion well managed; occasional lapses. overall_flow clear or mostly_clear; only occasional minor/moderate issues.
Band 7: clear progression; range of devices used flexibly with some over/under use. overall_flow=mostly_clear; some mechanical linking or an occasional unclear reference.
Band 6: generally coherent; devices used to some effect but faulty or mechanical; referencing not always clear. overall_flow mostly_clear or mixed; several moderate issues.
Band 5: organisation evident but not wholly logical; limited or overused devices; repetition from poor referencing. overall_flow=mixed; multiple moderate issues.
Band 4 and below: no clear progression; relationships between ideas unclear; referencing hard to follow. overall_flow=unclear or major issues dominate."#;

/// Coherence and Cohesion 评分项
pub struct CoherenceStage {
    task: WritingTask,
}

impl CoherenceStage {
    pub fn new(task: WritingTask) -> Self {
        Self { task }
    }
}

impl CriterionStage for CoherenceStage {
    type Evidence = CoherenceEvidence;

    fn criterion(&self) -> Criterion {
        Criterion::CoherenceCohesion
    }

    fn evidence_messages(&self, essay: &EssayStructure) -> Vec<ChatMessage> {
        let system = format!(
            "{}\nThis is an IELTS Writing {} response.\n\n{}",
            EVIDENCE_GUIDE, self.task, EVIDENCE_RULES
        );
        let user = labelled_sections(&[("essay_structure", to_prompt_json(&essay.to_prompt_json()))]);
        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    fn parse_evidence(&self, response: &str) -> AppResult<CoherenceEvidence> {
        parse_llm_json(&self.criterion().evidence_label(), response)
    }

    fn validate_evidence(
        &self,
        evidence: &CoherenceEvidence,
        essay: &EssayStructure,
    ) -> AppResult<()> {
        evidence.validate(essay, &self.criterion().evidence_label())
    }

    fn gates(&self, evidence: &CoherenceEvidence, essay: &EssayStructure) -> Vec<Gate> {
        coherence_gates(&essay.format_fields(), evidence)
    }

    fn score_messages(
        &self,
        essay: &EssayStructure,
        evidence: &CoherenceEvidence,
        gates: &[Gate],
    ) -> Vec<ChatMessage> {
        let system = format!(
            "{}\n\n{}\n\n{}",
            ANCHORS,
            gates_section(gates),
            SCORER_OUTPUT_RULES
        );
        vec![
            ChatMessage::system(system),
            ChatMessage::user(score_user_message(essay, evidence)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::effective_cap;
    use crate::services::criteria::test_support::small_essay;

    const EVIDENCE: &str = r#"{
        "paragraph_functions": [
            {"pid": "P1", "function": "thesis", "main_point_sid": "P1S2", "link_from_prev": null, "transition_sids": []},
            {"pid": "P2", "function": "reason", "main_point_sid": "P2S1", "transition_sids": ["P2S2"]}
        ],
        "cohesive_devices": [
            {"sid": "P2S2", "device": "Therefore", "device_type": "connector", "role": "result", "ok": true}
        ],
        "reference_chains": [
            {"entity": "cities", "sids": ["P1S1"], "ok": true}
        ],
        "issues": [
            {"sid": "P2S1", "issue_type": "missing_link", "severity": "major", "note": "abrupt shift"},
            {"sid": "P2S2", "issue_type": "jump_in_logic", "severity": "major", "note": "no explanation"}
        ],
        "overall_flow": "mixed"
    }"#;

    #[test]
    fn test_evidence_parses_validates_and_gates() {
        let essay = small_essay();
        let stage = CoherenceStage::new(WritingTask::Task2);
        let evidence = stage.parse_evidence(EVIDENCE).unwrap();
        stage.validate_evidence(&evidence, &essay).unwrap();
        // 两个 major 问题
        assert_eq!(effective_cap(&stage.gates(&evidence, &essay)), Some(5.0));
    }

    #[test]
    fn test_out_of_enum_function_is_schema_violation() {
        let stage = CoherenceStage::new(WritingTask::Task2);
        let raw = EVIDENCE.replace("\"thesis\"", "\"introduction\"");
        let err = stage.parse_evidence(&raw).unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn test_missing_paragraph_label_is_rejected() {
        let essay = small_essay();
        let stage = CoherenceStage::new(WritingTask::Task2);
        let mut evidence = stage.parse_evidence(EVIDENCE).unwrap();
        evidence.paragraph_functions.pop();
        assert!(stage.validate_evidence(&evidence, &essay).is_err());
    }

    #[test]
    fn test_prompts() {
        let essay = small_essay();
        let stage = CoherenceStage::new(WritingTask::Task1);
        let messages = stage.evidence_messages(&essay);
        assert!(messages[0].content.contains("COHERENCE AND COHESION"));
        assert!(messages[0].content.contains("task_1"));
        let evidence = stage.parse_evidence(EVIDENCE).unwrap();
        let messages = stage.score_messages(&essay, &evidence, &[]);
        assert!(messages[0].content.contains("Gates in force: none."));
        assert!(messages[1].content.contains("auditable_evidence"));
    }
}
