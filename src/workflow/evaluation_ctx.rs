//! 作文评估上下文
//!
//! 封装"我正在评估哪篇作文、哪个题型"这一信息，所有日志都以它开头

use std::fmt::Display;

use crate::models::WritingTask;

/// 作文评估上下文
#[derive(Debug, Clone)]
pub struct EvaluationCtx {
    /// 作答 ID
    pub attempt_id: String,

    /// 题型
    pub task: WritingTask,
}

impl EvaluationCtx {
    pub fn new(attempt_id: impl Into<String>, task: WritingTask) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            task,
        }
    }
}

impl Display for EvaluationCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[作文 {} {}]", self.attempt_id, self.task)
    }
}

/// 流水线所处阶段
///
/// 正常路径：Structured → EvidenceExtracted → Scored → Aggregated → Synthesized → Done。
/// StructuringFailed 和 CriterionFailed 是终止状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Structured,
    EvidenceExtracted,
    Scored,
    Aggregated,
    Synthesized,
    Done,
    StructuringFailed,
    CriterionFailed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::Done | PipelineStage::StructuringFailed | PipelineStage::CriterionFailed
        )
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Structured => "STRUCTURED",
            PipelineStage::EvidenceExtracted => "EVIDENCE_EXTRACTED",
            PipelineStage::Scored => "SCORED",
            PipelineStage::Aggregated => "AGGREGATED",
            PipelineStage::Synthesized => "SYNTHESIZED",
            PipelineStage::Done => "DONE",
            PipelineStage::StructuringFailed => "STRUCTURING_FAILED",
            PipelineStage::CriterionFailed => "CRITERION_FAILED",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctx_display() {
        let ctx = EvaluationCtx::new("a-7", WritingTask::Task2);
        assert_eq!(ctx.to_string(), "[作文 a-7 task_2]");
    }

    #[test]
    fn test_terminal_stages() {
        assert!(PipelineStage::Done.is_terminal());
        assert!(PipelineStage::CriterionFailed.is_terminal());
        assert!(!PipelineStage::Scored.is_terminal());
        assert_eq!(PipelineStage::EvidenceExtracted.to_string(), "EVIDENCE_EXTRACTED");
    }
}
