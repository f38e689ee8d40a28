//! 范文生成 - 能力层
//!
//! 在保留考生观点和结构的前提下，把作文改写到 Band 8–9。
//! 失败不影响评估结果本身，由批处理层决定是否调用。

use tracing::{debug, info};

use super::json_contract::parse_llm_json;
use crate::clients::{ChatMessage, CompletionRequest, LlmClient};
use crate::error::{AppError, AppResult};
use crate::models::{EvaluationRequest, ModelEssay, OverallResult, WritingTask};
use crate::scoring::is_valid_band;

/// 调用标签
pub const MODEL_ESSAY_LABEL: &str = "model_essay";

const MODEL_ESSAY_TEMPERATURE: f32 = 0.3;
const MODEL_ESSAY_MAX_TOKENS: u32 = 4000;

const MIN_TARGET: f64 = 8.0;
const MAX_TARGET: f64 = 9.0;

const SYSTEM_PROMPT: &str = r#"You are an expert IELTS Writing instructor who improves student essays to Band 8.0-9.0.

Band 8.0-9.0 criteria the improved essay must meet:
- Task: fully addresses all parts of the task with relevant, extended and supported ideas.
- Coherence and Cohesion: logical sequencing, well-managed cohesion, appropriate paragraphing.
- Lexical Resource: wide, fluent and flexible vocabulary; skilful use of less common items and collocations.
- Grammatical Range and Accuracy: wide range of structures; errors only as rare slips.

Improvement rules:
- PRESERVE the student's main ideas, arguments, examples, stance and overall structure.
- Do NOT add new ideas or arguments that are not in the original essay.
- Improve paragraphing, linking, vocabulary precision and grammatical accuracy.
- Keep a formal academic style. Length: about 250-300 words for Task 2, 150-200 words for Task 1.
- The improvement should be noticeable while keeping the student's voice.

OUTPUT JSON ONLY. No markdown. No backticks. Start with { and end with }:
{
    "target_score": 8.0,
    "content": "the complete improved essay",
    "analysis": "2-3 sentences on the main changes"
}
target_score is 8.0, 8.5 or 9.0 and must reflect the quality of the improved essay."#;

/// 范文生成器
pub struct ModelEssayWriter<'a, C: LlmClient> {
    client: &'a C,
}

impl<'a, C: LlmClient> ModelEssayWriter<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// 生成范文；提供评估结果时把主要扣分点一并交给模型
    pub async fn generate(
        &self,
        request: &EvaluationRequest,
        result: Option<&OverallResult>,
    ) -> AppResult<ModelEssay> {
        let task = request.validate()?;
        let completion = CompletionRequest::new(
            MODEL_ESSAY_LABEL,
            build_messages(task, request, result),
        )
        .with_temperature(MODEL_ESSAY_TEMPERATURE)
        .with_max_tokens(MODEL_ESSAY_MAX_TOKENS);

        let response = self.client.complete(completion).await?;
        debug!("{}: 响应 {} 字符", MODEL_ESSAY_LABEL, response.len());

        let essay = parse_model_essay(&response)?;
        info!(
            "[作文 {}] 范文生成完成: 目标 {:.1}, {} 词",
            request.attempt_id,
            essay.target_score,
            essay.content.split_whitespace().count()
        );
        Ok(essay)
    }
}

/// 构建范文提示词
pub fn build_messages(
    task: WritingTask,
    request: &EvaluationRequest,
    result: Option<&OverallResult>,
) -> Vec<ChatMessage> {
    let mut user = format!(
        "Improve the student's answer for this IELTS Writing {} task.\n\nTASK DESCRIPTION:\n{}\n",
        task,
        non_blank(&request.essay_prompt).unwrap_or("(not provided)")
    );

    if let Some(image_text) = request.image_text().and_then(non_blank) {
        user.push_str(&format!("\nINPUT IMAGE CONTENT:\n{}\n", image_text));
    }

    user.push_str(&format!(
        "\nSTUDENT'S ORIGINAL ANSWER:\n{}\n",
        request.raw_answer_text.trim()
    ));

    if let Some(result) = result {
        let mut focus = result.overall_feedback.what_hurt_your_score.clone();
        focus.extend(result.overall_feedback.band7_to_band8_focus.iter().cloned());
        if !focus.is_empty() {
            let lines = focus
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n");
            user.push_str(&format!(
                "\nCURRENT OVERALL BAND: {:.1}\nISSUES TO FIX:\n{}\n",
                result.score.overall, lines
            ));
        }
    }

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// 解析并校验范文
pub fn parse_model_essay(response: &str) -> AppResult<ModelEssay> {
    let essay: ModelEssay = parse_llm_json(MODEL_ESSAY_LABEL, response)?;

    if !is_valid_band(essay.target_score)
        || !(MIN_TARGET..=MAX_TARGET).contains(&essay.target_score)
    {
        return Err(AppError::invalid_value(
            MODEL_ESSAY_LABEL,
            "target_score",
            format!("{} 不在 8.0–9.0 之间或不是半分", essay.target_score),
        ));
    }
    if essay.content.trim().is_empty() {
        return Err(AppError::invalid_value(MODEL_ESSAY_LABEL, "content", "不能为空"));
    }
    Ok(essay)
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EvaluationRequest {
        EvaluationRequest::new(
            "a-1",
            "task_1",
            "The chart shows car ownership.",
            "Car ownership rose steadily.",
        )
        .with_image_text("Line graph, 1990-2020, cars per household")
    }

    #[test]
    fn test_parse_model_essay() {
        let essay = parse_model_essay(
            r#"{"target_score": 8.5, "content": "Car ownership climbed steadily."}"#,
        )
        .unwrap();
        assert_eq!(essay.target_score, 8.5);
        assert!(essay.analysis.is_empty());
    }

    #[test]
    fn test_target_score_bounds() {
        for raw in [
            r#"{"target_score": 7.5, "content": "x"}"#,
            r#"{"target_score": 8.2, "content": "x"}"#,
            r#"{"target_score": 9.5, "content": "x"}"#,
            r#"{"target_score": 8.0, "content": "  "}"#,
        ] {
            let err = parse_model_essay(raw).unwrap_err();
            assert_eq!(err.kind(), "schema_violation", "{}", raw);
        }
    }

    #[test]
    fn test_prompt_includes_image_text_and_answer() {
        let messages = build_messages(WritingTask::Task1, &request(), None);
        assert!(messages[0].content.contains("Band 8.0-9.0"));
        assert!(messages[1].content.contains("INPUT IMAGE CONTENT:\nLine graph"));
        assert!(messages[1].content.contains("Car ownership rose steadily."));
        assert!(!messages[1].content.contains("ISSUES TO FIX"));
    }

    #[test]
    fn test_missing_prompt_is_marked() {
        let mut req = request();
        req.essay_prompt = String::new();
        let messages = build_messages(WritingTask::Task1, &req, None);
        assert!(messages[1].content.contains("(not provided)"));
    }
}
