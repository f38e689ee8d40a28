use serde::{Deserialize, Serialize};

use super::criterion::WritingTask;
use crate::error::{AppResult, InputError};

/// 一次作文评估请求
///
/// 对应请求目录中的一个 TOML 文件：
///
/// ```toml
/// attempt_id = "a-001"
/// task_type = "task_2"
/// essay_prompt = "Some people think ..."
/// raw_answer_text = """
/// ...
/// """
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// 为空时由加载器用文件名补齐
    #[serde(default)]
    pub attempt_id: String,
    /// 题目原文（可以为空）
    #[serde(default)]
    pub essay_prompt: String,
    /// 考生作答原文
    pub raw_answer_text: String,
    /// 题型标识，见 `WritingTask::from_str`
    #[serde(default)]
    pub task_type: String,
    /// Task 1 图表的文字描述（可选）
    #[serde(default)]
    pub image_text: Option<String>,
    /// 加载来源（不参与序列化）
    #[serde(skip)]
    pub file_path: Option<String>,
}

impl EvaluationRequest {
    pub fn new(
        attempt_id: impl Into<String>,
        task_type: impl Into<String>,
        essay_prompt: impl Into<String>,
        raw_answer_text: impl Into<String>,
    ) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            essay_prompt: essay_prompt.into(),
            raw_answer_text: raw_answer_text.into(),
            task_type: task_type.into(),
            image_text: None,
            file_path: None,
        }
    }

    pub fn with_image_text(mut self, image_text: impl Into<String>) -> Self {
        self.image_text = Some(image_text.into());
        self
    }

    /// 检查请求并解析题型
    ///
    /// 空作答和缺失题型在这里就被拒绝，不会产生任何 LLM 调用。
    pub fn validate(&self) -> AppResult<WritingTask> {
        if self.raw_answer_text.trim().is_empty() {
            return Err(InputError::EmptyAnswer {
                attempt_id: self.attempt_id.clone(),
            }
            .into());
        }
        if self.task_type.trim().is_empty() {
            return Err(InputError::MissingTaskType {
                attempt_id: self.attempt_id.clone(),
            }
            .into());
        }
        self.task_type.parse()
    }

    /// 非空的图表描述
    pub fn image_text(&self) -> Option<&str> {
        self.image_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_answer() {
        let request = EvaluationRequest::new("a-1", "task_2", "prompt", "   \n\t ");
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind(), "input_error");
    }

    #[test]
    fn test_validate_rejects_missing_task_type() {
        let request = EvaluationRequest::new("a-1", "", "prompt", "Some essay text.");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_parses_task() {
        let request = EvaluationRequest::new("a-1", "Task 1", "", "The chart shows data.");
        assert_eq!(request.validate().unwrap(), WritingTask::Task1);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let content = r#"
attempt_id = "a-42"
task_type = "task_2"
raw_answer_text = """
Line one.

Line two.
"""
"#;
        let request: EvaluationRequest = toml::from_str(content).unwrap();
        assert_eq!(request.attempt_id, "a-42");
        assert_eq!(request.essay_prompt, "");
        assert!(request.image_text().is_none());
        assert!(request.raw_answer_text.contains("Line two."));
    }
}
