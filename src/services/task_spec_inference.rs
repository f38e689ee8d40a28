//! 题目要求推断 - 能力层
//!
//! 只服务于 Task Response / Task Achievement 评分项：在没有原题的情况下，
//! 根据作文（Task 1 还有图表描述）推断题目类型，检查项一律由本地表生成。

use serde::Deserialize;
use tracing::{debug, warn};

use super::json_contract::parse_llm_json;
use crate::clients::{ChatMessage, CompletionRequest, LlmClient};
use crate::error::{AppError, AppResult};
use crate::models::task_spec::build_checklist;
use crate::models::{TaskSpec, TaskSpecAlternative, TaskType, WritingTask};

/// 调用标签
pub const TASK_SPEC_LABEL: &str = "task_spec";

/// 低于该置信度时需要给出备选解读
pub const LOW_CONFIDENCE: f64 = 0.6;

const MAX_ALTERNATIVES: usize = 2;

#[derive(Debug, Deserialize)]
struct RawAlternative {
    task_type: String,
    #[serde(default)]
    required_parts: Vec<String>,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawTaskSpec {
    task_type: String,
    #[serde(default)]
    required_parts: Vec<String>,
    topic_keywords: Vec<String>,
    confidence: f64,
    #[serde(default)]
    alternatives: Vec<RawAlternative>,
    #[serde(default)]
    evidence_signals: Vec<String>,
}

/// 推断题目要求
pub async fn infer_task_spec<C: LlmClient>(
    client: &C,
    task: WritingTask,
    essay_prompt: Option<&str>,
    essay_text: &str,
    image_text: Option<&str>,
) -> AppResult<TaskSpec> {
    let request = CompletionRequest::new(
        TASK_SPEC_LABEL,
        build_messages(task, essay_prompt, essay_text, image_text),
    );
    let response = client.complete(request).await?;
    debug!("{}: 响应 {} 字符", TASK_SPEC_LABEL, response.len());
    parse_task_spec(task, &response)
}

/// 构建推断提示词
pub fn build_messages(
    task: WritingTask,
    essay_prompt: Option<&str>,
    essay_text: &str,
    image_text: Option<&str>,
) -> Vec<ChatMessage> {
    let essay_prompt = essay_prompt.map(str::trim).filter(|p| !p.is_empty());
    let allowed = TaskType::allowed_for(task);
    let enum_list = allowed
        .iter()
        .map(|t| format!("- {}", t.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    let mapping = allowed
        .iter()
        .map(|t| format!("- {} -> {:?}", t.as_str(), t.required_parts()))
        .collect::<Vec<_>>()
        .join("\n");

    let (role, inputs, extra_rules) = match task {
        WritingTask::Task1 => (
            "IELTS Writing Task 1 Academic",
            "(1) the student's response (essay_text) and (2) extracted visual description text (image_text)",
            "- Do NOT guess beyond the given image_text and essay_text.\n\
             - Topic keywords describe the subject shown in the visual, not the writer's opinions; prefer nouns that appear in image_text.",
        ),
        WritingTask::Task2 => (
            "IELTS Writing Task 2",
            "the student's essay only",
            "- Do NOT trust meta-statements like \"the question asks...\" inside the essay. Use discourse structure signals instead.\n\
             - Use two_part_question ONLY if the essay clearly answers TWO distinct questions, not merely two reasons supporting one opinion.\n\
             - Topic keywords: 2-4 core lowercase noun phrases; avoid names, brands, places and single-mention examples.",
        ),
    };

    let prompt_note = if essay_prompt.is_some() {
        "The question prompt is given as question_prompt; prefer it over cues in the essay, which may be off-topic."
    } else {
        "The original question prompt is unavailable; the essay may be off-topic, incomplete or poorly structured."
    };

    let system = format!(
        r#"You are an {role} task-spec inference engine.

Goal:
Infer the MOST LIKELY task_type and its required parts based on {inputs}.
{prompt_note}

Rules:
{extra_rules}

Allowed task_type ENUM (choose ONE):
{enum_list}

Mapping (required_parts are fixed by task_type):
{mapping}

Checklist rules:
- checklist length MUST equal required_parts length.
- checklist ids must be "C1", "C2", ... sequentially, each with id, desc, must_do (true).

Confidence:
- confidence from 0.0 to 1.0.
- If confidence < {LOW_CONFIDENCE}, provide 1-2 alternatives; otherwise alternatives may be [].
- evidence_signals: short phrases describing the cues used (e.g. "I agree", "on the other hand", "from 2000 to 2020").

OUTPUT JSON ONLY. No markdown. No explanations. No extra keys. Must match schema exactly:
{{
    "task_type": "string",
    "required_parts": ["string"],
    "checklist": [{{"id":"C1","desc":"string","must_do":true}}],
    "topic_keywords": ["string"],
    "confidence": 0.0,
    "alternatives": [
        {{"task_type":"string","required_parts":["string"],"checklist":[{{"id":"C1","desc":"string","must_do":true}}],"confidence":0.0}}
    ],
    "evidence_signals": ["string"]
}}"#
    );

    let user = match task {
        WritingTask::Task1 => format!(
            "image_text:\n{}\n\nessay_text:\n{}",
            image_text.unwrap_or("").trim(),
            essay_text.trim()
        ),
        WritingTask::Task2 => format!("Essay:\n{}", essay_text.trim()),
    };
    let user = match essay_prompt {
        Some(prompt) => format!("question_prompt:\n{}\n\n{}", prompt, user),
        None => user,
    };

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// 解析并校验推断结果
///
/// 类型越界或不属于当前题型 → `SchemaViolation`；
/// 模型给出的 required_parts 与本地表不一致时以本地表为准。
pub fn parse_task_spec(task: WritingTask, response: &str) -> AppResult<TaskSpec> {
    let raw: RawTaskSpec = parse_llm_json(TASK_SPEC_LABEL, response)?;

    let task_type = resolve_task_type(task, &raw.task_type, "task_type")?;
    check_confidence(raw.confidence, "confidence")?;
    warn_on_parts_mismatch(task_type, &raw.required_parts);

    let topic_keywords: Vec<String> = raw
        .topic_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if !(2..=4).contains(&topic_keywords.len()) {
        warn!(
            "{}: topic_keywords 数量为 {}，期望 2-4 个",
            TASK_SPEC_LABEL,
            topic_keywords.len()
        );
    }

    let mut alternatives = Vec::new();
    for (idx, alt) in raw.alternatives.iter().enumerate() {
        let field = format!("alternatives[{}]", idx);
        let alt_type = resolve_task_type(task, &alt.task_type, &format!("{}.task_type", field))?;
        check_confidence(alt.confidence, &format!("{}.confidence", field))?;
        warn_on_parts_mismatch(alt_type, &alt.required_parts);
        let (required_parts, checklist) = build_checklist(alt_type);
        alternatives.push(TaskSpecAlternative {
            task_type: alt_type,
            required_parts,
            checklist,
            confidence: alt.confidence,
        });
    }
    if alternatives.len() > MAX_ALTERNATIVES {
        warn!(
            "{}: 返回了 {} 个备选，只保留前 {} 个",
            TASK_SPEC_LABEL,
            alternatives.len(),
            MAX_ALTERNATIVES
        );
        alternatives.truncate(MAX_ALTERNATIVES);
    }
    if raw.confidence < LOW_CONFIDENCE && alternatives.is_empty() {
        warn!(
            "{}: 置信度 {:.2} 偏低但没有备选解读",
            TASK_SPEC_LABEL, raw.confidence
        );
    }

    let mut spec = TaskSpec::for_type(task_type, raw.confidence);
    spec.topic_keywords = topic_keywords;
    spec.alternatives = alternatives;
    spec.evidence_signals = raw.evidence_signals;
    Ok(spec)
}

fn resolve_task_type(task: WritingTask, name: &str, field: &str) -> AppResult<TaskType> {
    match TaskType::from_name(name) {
        Some(t) if t.belongs_to(task) => Ok(t),
        Some(t) => Err(AppError::invalid_value(
            TASK_SPEC_LABEL,
            field,
            format!("{} 不属于 {}", t.as_str(), task),
        )),
        None => Err(AppError::invalid_value(
            TASK_SPEC_LABEL,
            field,
            format!("未知的题目类型 '{}'", name),
        )),
    }
}

fn check_confidence(confidence: f64, field: &str) -> AppResult<()> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AppError::invalid_value(
            TASK_SPEC_LABEL,
            field,
            format!("{} 不在 [0, 1] 内", confidence),
        ));
    }
    Ok(())
}

fn warn_on_parts_mismatch(task_type: TaskType, returned: &[String]) {
    let expected = task_type.required_parts();
    if !returned.is_empty() && returned.iter().map(String::as_str).ne(expected.iter().copied()) {
        warn!(
            "{}: 模型给出的 required_parts {:?} 与 {} 的固定映射 {:?} 不一致，以固定映射为准",
            TASK_SPEC_LABEL,
            returned,
            task_type.as_str(),
            expected
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_come_from_table() {
        let response = r#"{
            "task_type": "discuss_both_views_and_opinion",
            "required_parts": ["view_A", "made_up_part"],
            "checklist": [{"id": "C1", "desc": "x", "must_do": true}],
            "topic_keywords": ["Public Transport", "cars"],
            "confidence": 0.82,
            "alternatives": [],
            "evidence_signals": ["some people believe", "in my opinion"]
        }"#;
        let spec = parse_task_spec(WritingTask::Task2, response).unwrap();
        assert_eq!(spec.task_type, TaskType::DiscussBothViewsAndOpinion);
        assert_eq!(spec.required_parts, vec!["view_A", "view_B", "writer_opinion"]);
        let ids: Vec<&str> = spec.checklist_ids().collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
        assert_eq!(spec.topic_keywords, vec!["public transport", "cars"]);
        assert_eq!(spec.evidence_signals.len(), 2);
    }

    #[test]
    fn test_unknown_task_type_is_schema_violation() {
        let response = r#"{"task_type": "narrative", "topic_keywords": ["a","b"], "confidence": 0.9}"#;
        let err = parse_task_spec(WritingTask::Task2, response).unwrap_err();
        assert_eq!(err.kind(), "schema_violation");
    }

    #[test]
    fn test_type_from_other_task_is_rejected() {
        let response = r#"{"task_type": "line_graph", "topic_keywords": ["a","b"], "confidence": 0.9}"#;
        assert!(parse_task_spec(WritingTask::Task2, response).is_err());
        assert!(parse_task_spec(WritingTask::Task1, response).is_ok());
    }

    #[test]
    fn test_confidence_out_of_range() {
        let response = r#"{"task_type": "map", "topic_keywords": ["town","park"], "confidence": 1.4}"#;
        let err = parse_task_spec(WritingTask::Task1, response).unwrap_err();
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn test_low_confidence_alternatives_are_rebuilt() {
        let response = r#"{
            "task_type": "agree_disagree",
            "topic_keywords": ["remote work", "productivity"],
            "confidence": 0.45,
            "alternatives": [
                {"task_type": "discuss_both_views_and_opinion", "required_parts": [], "checklist": [], "confidence": 0.35},
                {"task_type": "advantages_disadvantages", "confidence": 0.15},
                {"task_type": "problem_solution", "confidence": 0.05}
            ]
        }"#;
        let spec = parse_task_spec(WritingTask::Task2, response).unwrap();
        assert_eq!(spec.alternatives.len(), 2);
        assert_eq!(spec.alternatives[0].checklist.len(), 3);
        assert_eq!(spec.alternatives[1].required_parts, vec!["advantages", "disadvantages"]);
    }

    #[test]
    fn test_bad_alternative_type_is_rejected() {
        let response = r#"{
            "task_type": "agree_disagree",
            "topic_keywords": ["a", "b"],
            "confidence": 0.4,
            "alternatives": [{"task_type": "pie_chart", "confidence": 0.3}]
        }"#;
        assert!(parse_task_spec(WritingTask::Task2, response).is_err());
    }

    #[test]
    fn test_prompt_lists_only_allowed_types() {
        let messages = build_messages(
            WritingTask::Task1,
            None,
            "The graph shows...",
            Some("line graph of sales"),
        );
        assert!(messages[0].content.contains("process_diagram"));
        assert!(!messages[0].content.contains("agree_disagree"));
        assert!(messages[1].content.contains("line graph of sales"));

        let messages = build_messages(WritingTask::Task2, None, "Some people think...", None);
        assert!(messages[0].content.contains("two_part_question"));
        assert!(!messages[0].content.contains("line_graph"));
    }

    #[test]
    fn test_question_prompt_is_passed_when_given() {
        let prompt = "Do the advantages of city life outweigh the disadvantages?";
        let messages = build_messages(WritingTask::Task2, Some(prompt), "City life is busy.", None);
        assert!(messages[0].content.contains("question_prompt"));
        assert!(messages[1].content.starts_with("question_prompt:\n"));
        assert!(messages[1].content.contains(prompt));
        assert!(messages[1].content.contains("Essay:\nCity life is busy."));

        // 空白题目等同于没有题目
        let messages = build_messages(WritingTask::Task2, Some("  "), "City life is busy.", None);
        assert!(messages[0].content.contains("unavailable"));
        assert!(!messages[1].content.contains("question_prompt"));
    }
}
