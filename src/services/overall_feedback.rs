//! 综合反馈 - 能力层
//!
//! 输入四个评分项的最终结果，输出跨评分项的总评和 4–8 条行内修改建议。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::criteria::labelled_sections;
use super::json_contract::{parse_llm_json, to_prompt_json};
use crate::clients::{ChatMessage, CompletionRequest, LlmClient};
use crate::error::{AppError, AppResult};
use crate::models::{
    Criterion, EssayStructure, OverallFeedback, PerCriterion, Suggestion, WritingTask,
};

/// 调用标签
pub const OVERALL_FEEDBACK_LABEL: &str = "overall_feedback";

pub const MIN_SUGGESTIONS: usize = 4;
pub const MAX_SUGGESTIONS: usize = 8;

const SYSTEM_PROMPT: &str = r#"You are an IELTS Writing examiner and writing coach.

Your task:
- Generate an OVERALL IELTS Writing feedback report by synthesizing the Task, Coherence and Cohesion,
  Lexical Resource and Grammatical Range and Accuracy results provided.

Hard rules:
1. Output MUST be valid JSON only. No markdown. No extra text.
2. Be exam-focused, objective and constructive.
3. Do NOT invent errors; rely strictly on the provided inputs.
4. Do NOT repeat or paraphrase the criterion-level summaries. Synthesize, prioritize and add value.

overall_feedback requirements:
- overall_evaluation: a clear overall evaluation in 2-4 sentences.
- what_you_did_well: 3-6 bullet points.
- what_hurt_your_score: 3-6 bullet points.
- band7_to_band8_focus: 3-5 bullet points on the most effective upgrades to reach the next band.
- Use concrete exam language (relevance, development, cohesion, referencing, precision, error patterns).

Return JSON in EXACTLY the following schema:
{
    "overall_feedback": {
        "overall_evaluation": "string",
        "what_you_did_well": ["string"],
        "what_hurt_your_score": ["string"],
        "band7_to_band8_focus": ["string"]
    },
    "suggestions": [
        {
            "original_text": "string",
            "suggested_text": "string",
            "category": "task" | "coherence_and_cohesion" | "lexical_resource" | "grammar",
            "explanation": "string",
            "evidence_sids": ["P1S1"]
        }
    ]
}

Suggestion guidelines:
- Provide 4-8 suggestions in total, at least one per criterion whose results list a weakness.
- evidence_sids may only contain sentence ids that exist in essay_structure.
- original_text is EITHER a SHORT exact span copied from the essay OR a generic issue description
  (e.g. "Unclear pronoun reference"). Never write a full sentence that is not in the essay.
- Suggestions must be actionable and realistic for IELTS candidates."#;

/// 综合阶段的输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    #[serde(alias = "overall_summary")]
    pub overall_feedback: OverallFeedback,
    pub suggestions: Vec<Suggestion>,
}

/// 生成综合反馈
pub async fn synthesize<C: LlmClient>(
    client: &C,
    task: WritingTask,
    essay: &EssayStructure,
    per_criterion: &PerCriterion,
) -> AppResult<Synthesis> {
    let request = CompletionRequest::new(
        OVERALL_FEEDBACK_LABEL,
        build_messages(task, essay, per_criterion),
    );
    let response = client.complete(request).await?;
    debug!("{}: 响应 {} 字符", OVERALL_FEEDBACK_LABEL, response.len());
    parse_synthesis(&response, essay, per_criterion)
}

/// 构建综合反馈提示词
pub fn build_messages(
    task: WritingTask,
    essay: &EssayStructure,
    per_criterion: &PerCriterion,
) -> Vec<ChatMessage> {
    let system = format!(
        "{}\n\nThis is an IELTS Writing {} response; the task criterion is {}.",
        SYSTEM_PROMPT,
        task,
        task.task_criterion_name()
    );
    let user = labelled_sections(&[
        ("essay_structure", to_prompt_json(&essay.to_prompt_json())),
        (
            "task_feedback",
            to_prompt_json(&per_criterion.task_response),
        ),
        (
            "coherence_and_cohesion_feedback",
            to_prompt_json(&per_criterion.coherence_cohesion),
        ),
        (
            "lexical_resource_feedback",
            to_prompt_json(&per_criterion.lexical_resource),
        ),
        ("grammar_feedback", to_prompt_json(&per_criterion.grammar)),
    ]);
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// 解析并校验综合反馈
pub fn parse_synthesis(
    response: &str,
    essay: &EssayStructure,
    per_criterion: &PerCriterion,
) -> AppResult<Synthesis> {
    let synthesis: Synthesis = parse_llm_json(OVERALL_FEEDBACK_LABEL, response)?;
    validate_feedback(&synthesis.overall_feedback, essay, per_criterion)?;
    validate_suggestions(&synthesis.suggestions, essay, per_criterion)?;
    Ok(synthesis)
}

fn validate_feedback(
    feedback: &OverallFeedback,
    essay: &EssayStructure,
    per_criterion: &PerCriterion,
) -> AppResult<()> {
    let checker = essay.checker(OVERALL_FEEDBACK_LABEL);
    checker.non_empty("overall_feedback.overall_evaluation", &feedback.overall_evaluation)?;
    reject_restated_summary(
        "overall_feedback.overall_evaluation",
        &feedback.overall_evaluation,
        per_criterion,
    )?;

    let lists = [
        ("what_you_did_well", &feedback.what_you_did_well),
        ("what_hurt_your_score", &feedback.what_hurt_your_score),
        ("band7_to_band8_focus", &feedback.band7_to_band8_focus),
    ];
    for (name, items) in lists {
        let field = format!("overall_feedback.{}", name);
        if items.is_empty() {
            return Err(AppError::invalid_value(
                OVERALL_FEEDBACK_LABEL,
                field,
                "至少需要 1 条",
            ));
        }
        for item in items.iter() {
            checker.non_empty(&field, item)?;
            reject_restated_summary(&field, item, per_criterion)?;
        }
    }
    Ok(())
}

/// 综合反馈不能原样照搬某个评分项的 summary
fn reject_restated_summary(field: &str, text: &str, per_criterion: &PerCriterion) -> AppResult<()> {
    let text = text.trim();
    for criterion in Criterion::ALL {
        if per_criterion.get(criterion).feedback.summary.trim() == text {
            return Err(AppError::invalid_value(
                OVERALL_FEEDBACK_LABEL,
                field,
                format!("照搬了 {} 的 summary", criterion),
            ));
        }
    }
    Ok(())
}

/// 建议数量、字段、引用和评分项覆盖校验
pub fn validate_suggestions(
    suggestions: &[Suggestion],
    essay: &EssayStructure,
    per_criterion: &PerCriterion,
) -> AppResult<()> {
    if !(MIN_SUGGESTIONS..=MAX_SUGGESTIONS).contains(&suggestions.len()) {
        return Err(AppError::invalid_value(
            OVERALL_FEEDBACK_LABEL,
            "suggestions",
            format!(
                "需要 {}–{} 条，实际 {} 条",
                MIN_SUGGESTIONS,
                MAX_SUGGESTIONS,
                suggestions.len()
            ),
        ));
    }

    let checker = essay.checker(OVERALL_FEEDBACK_LABEL);
    for (i, suggestion) in suggestions.iter().enumerate() {
        let field = |name: &str| format!("suggestions[{}].{}", i, name);
        checker.non_empty(&field("original_text"), &suggestion.original_text)?;
        checker.non_empty(&field("suggested_text"), &suggestion.suggested_text)?;
        checker.non_empty(&field("explanation"), &suggestion.explanation)?;
        checker.sids(&suggestion.evidence_sids)?;

        if is_fabricated_sentence(&suggestion.original_text, essay) {
            return Err(AppError::invalid_value(
                OVERALL_FEEDBACK_LABEL,
                field("original_text"),
                format!("'{}' 不是原文片段", suggestion.original_text),
            ));
        }
    }

    // 每个列出了不足的评分项至少一条建议
    let covered: HashSet<Criterion> = suggestions.iter().map(|s| s.category.criterion()).collect();
    for criterion in Criterion::ALL {
        let has_weakness = per_criterion
            .get(criterion)
            .feedback
            .weaknesses
            .iter()
            .any(|w| !w.trim().is_empty());
        if has_weakness && !covered.contains(&criterion) {
            return Err(AppError::invalid_value(
                OVERALL_FEEDBACK_LABEL,
                "suggestions",
                format!("没有针对 {} 的建议", criterion),
            ));
        }
    }
    Ok(())
}

/// 带句末标点的多词文本，但原文里找不到
fn is_fabricated_sentence(text: &str, essay: &EssayStructure) -> bool {
    let text = text.trim();
    let looks_like_sentence = text.contains(char::is_whitespace) && text.ends_with(['.', '!', '?']);
    looks_like_sentence && !essay.sentences().any(|s| s.text.contains(text))
}
