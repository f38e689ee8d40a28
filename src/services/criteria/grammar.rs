//! Grammatical Range and Accuracy

use super::{
    gates_section, labelled_sections, score_user_message, CriterionStage, EVIDENCE_RULES,
    SCORER_OUTPUT_RULES,
};
use crate::clients::ChatMessage;
use crate::error::AppResult;
use crate::models::evidence::GrammarEvidence;
use crate::models::{Criterion, EssayStructure, WritingTask};
use crate::scoring::gates::grammar_gates;
use crate::scoring::Gate;
use crate::services::json_contract::{parse_llm_json, to_prompt_json};

const EVIDENCE_GUIDE: &str = r#"You are an IELTS Writing examiner focusing ONLY on GRAMMATICAL RANGE AND ACCURACY (GRA).
Do NOT evaluate task response, cohesion or vocabulary choice.

INPUT: essay_structure JSON (paragraphs with pid, sentences with sid and text)

WHAT TO EXTRACT:
A) sentence_analysis: EXACTLY one entry for EVERY sentence in essay_structure:
   {"sid", "sentence_type", "complex_features", "is_error_free"}
   sentence_type one of [simple, compound, complex, compound_complex, fragment_or_faulty]
   complex_features subset of [subordinate_clause, relative_clause, conditional, passive,
   participle_clause, nominalisation, coordination, advanced_punctuation]
B) grammar_errors: {"sid", "span" (exact words), "error_type", "severity": minor|moderate|major,
   "impact": minimal|some|impedes, "note"}
   error_type one of [SVA, tense, article, preposition, pronoun, agreement, word_order,
   missing_word, extra_word, fragment, run_on, parallelism, other]
C) punctuation_issues: {"sid", "span" (exact characters), "issue_type", "severity", "impact", "note"}
   issue_type one of [comma_splice, missing_comma, unnecessary_comma, apostrophe, capitalization, sentence_boundary, other]
D) summaries (categorical descriptors, never numbers):
   - structure_range: wide|moderate|limited|very_limited
   - complex_sentence_share: high|medium|low
   - error_density: low|medium|high
   - error_impact_overall: minimal|some|impedes
   - punctuation_control: strong|adequate|weak

OUTPUT schema:
{
    "sentence_analysis": [{"sid": "P1S1", "sentence_type": "complex", "complex_features": ["relative_clause"], "is_error_free": true}],
    "grammar_errors": [{"sid": "P2S3", "span": "exact words", "error_type": "article", "severity": "minor", "impact": "minimal", "note": "string"}],
    "punctuation_issues": [{"sid": "P3S1", "span": "exact characters", "issue_type": "comma_splice", "severity": "moderate", "impact": "some", "note": "string"}],
    "summaries": {
        "structure_range": "moderate",
        "complex_sentence_share": "medium",
        "error_density": "low",
        "error_impact_overall": "minimal",
        "punctuation_control": "adequate"
    }
}"#;

const ANCHORS: &str = r#"You are an IELTS Writing examiner scoring ONLY GRAMMATICAL RANGE AND ACCURACY (GRA).
Base your judgment ONLY on format_fields and auditable_evidence. Do NOT invent evidence.

BAND ANCHORS (operational signals from the evidence):
Band 9: wide range of structures with full flexibility and accuracy; rare minor slips. structure_range=wide; error_density low; punctuation strong.
Band 8: wide range; the majority of sentences error-free; occasional non-systematic errors. structure_range wide; complex share high or medium; errors minimal.
Band 7: a variety of complex structures used with some flexibility; frequent error-free sentences; a few errors persist. structure_range moderate or wide; errors minimal or some.
Band 6: a mix of simple and complex forms; some errors in grammar and punctuation that rarely reduce communication. complex share medium; error_density medium.
Band 5: limited range; complex sentences attempted but less accurate than simple ones; frequent errors that may cause some difficulty. structure_range limited; error_density high.
Band 4 and below: very limited range; subordinate clauses rare; errors predominate and impede meaning. structure_range very_limited or impact impedes.
Responses of 20 words or fewer are Band 1."#;

/// Grammatical Range and Accuracy 评分项
pub struct GrammarStage {
    task: WritingTask,
}

impl GrammarStage {
    pub fn new(task: WritingTask) -> Self {
        Self { task }
    }
}

impl CriterionStage for GrammarStage {
    type Evidence = GrammarEvidence;

    fn criterion(&self) -> Criterion {
        Criterion::Grammar
    }

    fn evidence_messages(&self, essay: &EssayStructure) -> Vec<ChatMessage> {
        let system = format!(
            "{}\nThis is an IELTS Writing {} response with {} sentences.\n\n{}",
            EVIDENCE_GUIDE,
            self.task,
            essay.sentence_count(),
            EVIDENCE_RULES
        );
        let user = labelled_sections(&[("essay_structure", to_prompt_json(&essay.to_prompt_json()))]);
        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    fn parse_evidence(&self, response: &str) -> AppResult<GrammarEvidence> {
        parse_llm_json(&self.criterion().evidence_label(), response)
    }

    fn validate_evidence(&self, evidence: &GrammarEvidence, essay: &EssayStructure) -> AppResult<()> {
        evidence.validate(essay, &self.criterion().evidence_label())
    }

    fn gates(&self, evidence: &GrammarEvidence, essay: &EssayStructure) -> Vec<Gate> {
        grammar_gates(&essay.format_fields(), evidence)
    }

    fn score_messages(
        &self,
        essay: &EssayStructure,
        evidence: &GrammarEvidence,
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
