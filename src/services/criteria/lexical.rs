//! Lexical Resource

use super::{
    gates_section, labelled_sections, score_user_message, CriterionStage, EVIDENCE_RULES,
    SCORER_OUTPUT_RULES,
};
use crate::clients::ChatMessage;
use crate::error::AppResult;
use crate::models::evidence::LexicalEvidence;
use crate::models::{Criterion, EssayStructure, WritingTask};
use crate::scoring::gates::lexical_gates;
use crate::scoring::Gate;
use crate::services::json_contract::{parse_llm_json, to_prompt_json};

const EVIDENCE_GUIDE: &str = r#"You are an IELTS Writing examiner focusing ONLY on LEXICAL RESOURCE (LR).
Do NOT evaluate task response, cohesion or grammar.

INPUT: essay_structure JSON (paragraphs with pid, sentences with sid and text)

WHAT TO EXTRACT:
A) repetition: words or phrases repeated enough to show limited range:
   {"lemma_or_phrase", "count", "example_sids" (at least one)}
B) vocabulary_highlights: strong, precise or less common items:
   {"sid", "span" (exact words), "category", "note"}
   category one of [topic_specific, attitude_marker, precise_wording, collocation, sophisticated_phrase]
C) lexical_errors: {"sid", "span" (exact words), "error_type", "severity": minor|moderate|major,
   "impact": minimal|some|impedes, "note"}
   error_type one of [wrong_word_choice, collocation_error, register_inappropriate, awkward_phrase, spelling, word_formation]
   impact: minimal = barely noticeable; some = noticeable but meaning clear; impedes = meaning unclear
D) summaries (categorical descriptors, never numbers):
   - range_level: wide|sufficient|limited|extremely_limited
   - precision_level: high|medium|low
   - collocation_control: strong|adequate|weak
   - error_density: low|medium|high
   - error_impact_overall: minimal|some|impedes

OUTPUT schema:
{
    "repetition": [{"lemma_or_phrase": "important", "count": 4, "example_sids": ["P1S2", "P3S1"]}],
    "vocabulary_highlights": [{"sid": "P2S1", "span": "exact words", "category": "collocation", "note": "string"}],
    "lexical_errors": [{"sid": "P3S2", "span": "exact words", "error_type": "spelling", "severity": "minor", "impact": "minimal", "note": "string"}],
    "summaries": {
        "range_level": "sufficient",
        "precision_level": "medium",
        "collocation_control": "adequate",
        "error_density": "low",
        "error_impact_overall": "minimal"
    }
}"#;

const ANCHORS: &str = r#"You are an IELTS Writing examiner scoring ONLY LEXICAL RESOURCE (LR).
Base your judgment ONLY on format_fields and auditable_evidence. Do NOT invent evidence.

BAND ANCHORS (operational signals from the evidence):
Band 9: full flexibility and precise use; wide range; rare minor slips only. range_level=wide; precision high; error_density low with minimal impact.
Band 8: wide resource used fluently and flexibly; skilful use of less common items; occasional inaccuracies. range wide; precision high or medium; few minor errors.
Band 7: sufficient range for flexibility and precision; some less common items with awareness of style and collocation; occasional errors. range sufficient or wide; collocation adequate or strong; errors minimal or some.
Band 6: adequate range for the task; attempts less common vocabulary with some inaccuracy; errors do not impede communication. range sufficient; precision medium; error_density medium.
Band 5: limited range, minimally adequate; noticeable errors in word choice, spelling or word formation that may cause some difficulty. range limited; error_density medium or high.
Band 4 and below: basic vocabulary used repetitively; errors frequent and may impede meaning. range limited or extremely_limited; impact impedes.
Responses of 20 words or fewer are Band 1."#;

/// Lexical Resource 评分项
pub struct LexicalStage {
    task: WritingTask,
}

impl LexicalStage {
    pub fn new(task: WritingTask) -> Self {
        Self { task }
    }
}

impl CriterionStage for LexicalStage {
    type Evidence = LexicalEvidence;

    fn criterion(&self) -> Criterion {
        Criterion::LexicalResource
    }

    fn evidence_messages(&self, essay: &EssayStructure) -> Vec<ChatMessage> {
        let system = format!(
            "{}\nThis is an IELTS Writing {} response.\n\n{}",
            EVIDENCE_GUIDE, self.task, EVIDENCE_RULES
        );
        let user = labelled_sections(&[("essay_structure", to_prompt_json(&essay.to_prompt_json()))]);
        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    fn parse_evidence(&self, response: &str) -> AppResult<LexicalEvidence> {
        parse_llm_json(&self.criterion().evidence_label(), response)
    }

    fn validate_evidence(&self, evidence: &LexicalEvidence, essay: &EssayStructure) -> AppResult<()> {
        evidence.validate(essay, &self.criterion().evidence_label())
    }

    fn gates(&self, evidence: &LexicalEvidence, essay: &EssayStructure) -> Vec<Gate> {
        lexical_gates(&essay.format_fields(), evidence)
    }

    fn score_messages(
        &self,
        essay: &EssayStructure,
        evidence: &LexicalEvidence,
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
