//! Task Response (Task 2) / Task Achievement (Task 1)

use super::{
    gates_section, labelled_sections, score_user_message, CriterionStage, EVIDENCE_RULES,
    SCORER_OUTPUT_RULES,
};
use crate::clients::ChatMessage;
use crate::error::AppResult;
use crate::models::evidence::{TaskAchievementEvidence, TaskEvidence, TaskResponseEvidence};
use crate::models::{Criterion, EssayStructure, TaskSpec, WritingTask};
use crate::scoring::gates::task_gates;
use crate::scoring::Gate;
use crate::services::json_contract::{parse_llm_json, to_prompt_json};

const TASK2_EVIDENCE_GUIDE: &str = r#"You are an IELTS Writing Task 2 examiner focusing ONLY on TASK RESPONSE (TR).
Do NOT evaluate cohesion, vocabulary or grammar.

INPUT:
1) task_spec JSON (task_type, checklist, topic_keywords)
2) essay_structure JSON (paragraphs with pid, sentences with sid and text)

WHAT TO EXTRACT:
A) position_sentence_ids: sentences where the writer's position/opinion is stated (usually intro).
B) conclusion_sentence_ids: sentences forming the conclusion.
C) body_paragraphs: for EACH body paragraph (exclude intro and conclusion):
   - pid
   - topic_sentence_id: a sid from that paragraph, or null
   - main_idea: ONE sentence summarising the paragraph's main point, grounded in the paragraph
   - supporting_sentence_ids: sentences that explain/exemplify the main idea
   - idea_relevance: one of [direct, mostly_direct, partly_direct, weak, off_task]
   - support_quality: one of [excellent, good, fair, poor]
       * excellent: clear explanation + concrete support + explicit tie-back to the task
       * good: strong support but the tie-back may be slightly implicit
       * fair: some support but generic, leaps, or weakly linked
       * poor: minimal support or mostly assertions
   - over_generalisation_sentence_ids: broad claims without sufficient qualification/support
   - tie_back_missing_sentence_ids: examples/explanations not clearly linked back to the question
D) coverage_map: for EVERY checklist id (C1, C2, ...) the sentence ids that cover it ([] if none).
E) irrelevant_sentence_ids: off-topic sentences.
F) weak_or_risky_sentence_ids: [{"sid","reason"}] sentences that may weaken TR.
G) under_developed_sentence_ids: [{"sid","reason"}] ideas introduced but not developed.

OUTPUT schema:
{
    "position_sentence_ids": ["P1S2"],
    "conclusion_sentence_ids": ["P5S1"],
    "body_paragraphs": [
        {
            "pid": "P2",
            "topic_sentence_id": "P2S1",
            "main_idea": "string",
            "supporting_sentence_ids": ["P2S2"],
            "idea_relevance": "direct",
            "support_quality": "good",
            "over_generalisation_sentence_ids": [],
            "tie_back_missing_sentence_ids": []
        }
    ],
    "coverage_map": {"C1": {"checklist_desc": "string", "covered_by_sentence_ids": ["P1S2"]}},
    "irrelevant_sentence_ids": [],
    "weak_or_risky_sentence_ids": [{"sid": "P3S3", "reason": "string"}],
    "under_developed_sentence_ids": [{"sid": "P4S1", "reason": "string"}]
}"#;

const TASK1_EVIDENCE_GUIDE: &str = r#"You are an IELTS Writing Task 1 Academic examiner focusing ONLY on TASK ACHIEVEMENT (TA).
Do NOT evaluate cohesion, vocabulary or grammar. Do NOT introduce explanations beyond the data in image_text.

INPUT:
1) task_spec JSON (task_type, checklist, topic_keywords)
2) image_text (facts extracted from the visual input; may be empty)
3) essay_structure JSON (paragraphs with pid, sentences with sid and text)

WHAT TO EXTRACT:
A) intro_sentence_ids: sentences introducing what the visual shows.
B) overview_sentence_ids: sentences giving an OVERVIEW of main trends/stages/changes.
C) body_paragraphs: for EACH body paragraph:
   - pid
   - topic_sentence_id: a sid from that paragraph, or null
   - main_feature: ONE sentence describing the key feature covered in the paragraph
   - supporting_sentence_ids: sentences giving details (numbers, extremes, comparisons, stages)
   - data_or_feature_type: one of [trend, comparison, extreme, stage, location_change, category_breakdown, other]
   - accuracy_flag: one of [accurate, unclear, likely_inaccurate, unsupported]
   - accuracy_notes: short note grounded in image_text; if you cannot verify, use "unclear"
D) coverage_map: for EVERY checklist id the sentence ids that cover it ([] if none).
E) missing_or_weak_areas: checklist ids that are only weakly evidenced.
F) speculative_or_irrelevant_sentence_ids: sentences going beyond the data or irrelevant.
G) inaccurate_or_unsupported_claims: [{"sid","reason"}] claims contradicting or exceeding image_text.

OUTPUT schema:
{
    "intro_sentence_ids": ["P1S1"],
    "overview_sentence_ids": ["P2S1"],
    "body_paragraphs": [
        {
            "pid": "P3",
            "topic_sentence_id": "P3S1",
            "main_feature": "string",
            "supporting_sentence_ids": ["P3S2"],
            "data_or_feature_type": "trend",
            "accuracy_flag": "accurate",
            "accuracy_notes": "string"
        }
    ],
    "coverage_map": {"C1": {"checklist_desc": "string", "covered_by_sentence_ids": ["P2S1"]}},
    "missing_or_weak_areas": [],
    "speculative_or_irrelevant_sentence_ids": [],
    "inaccurate_or_unsupported_claims": [{"sid": "P4S1", "reason": "string"}]
}"#;

const TASK2_ANCHORS: &str = r#"You are an IELTS Writing Task 2 examiner scoring ONLY TASK RESPONSE (TR).
Base your judgment ONLY on task_spec, format_fields and auditable_evidence. Do NOT invent evidence.

TR assesses: how fully the task is answered (checklist coverage), how well main ideas are extended and
supported, relevance, clarity of position and conclusion, and appropriate format (>= 250 words, paragraphs, no bullets).

BAND ANCHORS (operational signals from the evidence):
Band 9: checklist fully covered; position and conclusion clear; most paragraphs support_quality=excellent; relevance direct; almost no weak or under-developed items.
Band 8: checklist covered; clear position; most paragraphs good/excellent; at most one lapse.
Band 7: checklist covered; clear position; support mixed (good + some fair) or repeated weak links / over-generalisation.
Band 6: main parts addressed though unevenly; conclusion weak or repetitive; several under-developed ideas.
Band 5: task only partly addressed; position unclear at times; limited development; some irrelevant detail.
Band 4: minimal response to the task; position hard to identify; ideas repetitive or irrelevant.
Band 3-1: does not address the task, largely irrelevant, or barely related to the prompt."#;

const TASK1_ANCHORS: &str = r#"You are an IELTS Writing Task 1 Academic examiner scoring ONLY TASK ACHIEVEMENT (TA).
Base your judgment ONLY on task_spec, format_fields and auditable_evidence. Do NOT speculate about the visual.

TA assesses: how fully and accurately the requirements are fulfilled (>= 150 words), selection of key
features with sufficient detail, accurate reporting of figures, comparisons and main trends, appropriate format.

BAND ANCHORS (operational signals from the evidence):
Band 9: checklist fully covered; clear overview; key features well selected and supported; almost no inaccuracy.
Band 8: clear overview; key features skilfully selected; mostly accurate; occasional omissions.
Band 7: clear overview; main trends/differences identified; key features could be extended; minor lapses.
Band 6: overview attempted but weak; development uneven; some unclear or unsupported details.
Band 5: weak or no overview; mechanical listing; frequent unsupported claims or irrelevant detail.
Band 4: few key features; format may be inappropriate; information repetitive or inaccurate.
Band 3-1: does not address the requirements or barely relates to the task."#;

/// Task Response / Task Achievement 评分项
pub struct TaskStage {
    task: WritingTask,
    spec: TaskSpec,
    image_text: Option<String>,
}

impl TaskStage {
    pub fn new(task: WritingTask, spec: TaskSpec, image_text: Option<&str>) -> Self {
        Self {
            task,
            spec,
            image_text: image_text.map(str::to_string),
        }
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    fn label(&self) -> String {
        Criterion::TaskResponse.evidence_label()
    }
}

impl CriterionStage for TaskStage {
    type Evidence = TaskEvidence;

    fn criterion(&self) -> Criterion {
        Criterion::TaskResponse
    }

    fn evidence_messages(&self, essay: &EssayStructure) -> Vec<ChatMessage> {
        let guide = match self.task {
            WritingTask::Task1 => TASK1_EVIDENCE_GUIDE,
            WritingTask::Task2 => TASK2_EVIDENCE_GUIDE,
        };
        let system = format!("{}\n\n{}", guide, EVIDENCE_RULES);

        let mut sections = vec![("task_spec", to_prompt_json(&self.spec))];
        if self.task == WritingTask::Task1 {
            sections.push((
                "image_text",
                self.image_text.as_deref().unwrap_or("").trim().to_string(),
            ));
        }
        sections.push(("essay_structure", to_prompt_json(&essay.to_prompt_json())));

        vec![
            ChatMessage::system(system),
            ChatMessage::user(labelled_sections(&sections)),
        ]
    }

    fn parse_evidence(&self, response: &str) -> AppResult<TaskEvidence> {
        let label = self.label();
        Ok(match self.task {
            WritingTask::Task1 => {
                TaskEvidence::Task1(parse_llm_json::<TaskAchievementEvidence>(&label, response)?)
            }
            WritingTask::Task2 => {
                TaskEvidence::Task2(parse_llm_json::<TaskResponseEvidence>(&label, response)?)
            }
        })
    }

    fn validate_evidence(&self, evidence: &TaskEvidence, essay: &EssayStructure) -> AppResult<()> {
        evidence.validate(essay, &self.spec, &self.label())
    }

    fn gates(&self, evidence: &TaskEvidence, essay: &EssayStructure) -> Vec<Gate> {
        task_gates(self.task, &essay.format_fields(), &self.spec, evidence)
    }

    fn score_messages(
        &self,
        essay: &EssayStructure,
        evidence: &TaskEvidence,
        gates: &[Gate],
    ) -> Vec<ChatMessage> {
        let anchors = match self.task {
            WritingTask::Task1 => TASK1_ANCHORS,
            WritingTask::Task2 => TASK2_ANCHORS,
        };
        let system = format!(
            "{}\n\n{}\n\n{}\n- Use band_anchor for the whole-number anchor; never exceed a gate.",
            anchors,
            gates_section(gates),
            SCORER_OUTPUT_RULES
        );
        let user = labelled_sections(&[
            ("task_spec", to_prompt_json(&self.spec)),
            ("evidence", score_user_message(essay, evidence)),
        ]);
        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }
}
