//! 单篇作文评估器 - 编排层
//!
//! ## 职责
//!
//! 按状态机驱动一篇作文的完整评估：
//!
//! ```text
//! 输入校验 → STRUCTURED
//!          → 四个评分项并行（证据 → 打分）→ EVIDENCE_EXTRACTED / SCORED
//!          → AGGREGATED → SYNTHESIZED → DONE
//! ```
//!
//! - 输入不合法时在任何 LLM 调用之前返回 `InputError`
//! - 题目要求推断只是 Task Response 分支的前置步骤，不阻塞其它三个分支
//! - 任一分支失败即整体失败，其余分支随 future 被丢弃而取消

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{error, info, warn};

use crate::clients::LlmClient;
use crate::error::{AppError, AppResult, InputError};
use crate::models::{
    Criterion, EssayStructure, EvaluationMeta, EvaluationRequest, OverallResult, PerCriterion,
    WritingTask, SCORE_SCALE,
};
use crate::scoring::aggregate;
use crate::services::overall_feedback::synthesize;
use crate::services::task_spec_inference::{infer_task_spec, LOW_CONFIDENCE};
use crate::services::{structure_essay, CoherenceStage, GrammarStage, LexicalStage, TaskStage};
use crate::workflow::{CriterionFlow, EvaluationCtx, PipelineStage};

/// 作文评估器
///
/// 通过构造函数注入 LLM 客户端，测试时可以换成脚本化的替身。
pub struct EssayEvaluator<C: LlmClient> {
    client: Arc<C>,
}

impl<C: LlmClient> Clone for EssayEvaluator<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: LlmClient> EssayEvaluator<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 评估一篇作文
    pub async fn evaluate(&self, request: &EvaluationRequest) -> AppResult<OverallResult> {
        let task = request.validate()?;
        let ctx = EvaluationCtx::new(request.attempt_id.as_str(), task);

        let essay = structure_essay(&request.raw_answer_text);
        if essay.is_empty() {
            warn!("{} → {}", ctx, PipelineStage::StructuringFailed);
            return Err(InputError::EmptyAnswer {
                attempt_id: request.attempt_id.clone(),
            }
            .into());
        }
        info!(
            "{} → {}: {} 词, {} 段, {} 句{}",
            ctx,
            PipelineStage::Structured,
            essay.word_count,
            essay.paragraph_count(),
            essay.sentence_count(),
            if essay.has_bullets { ", 含项目符号" } else { "" }
        );

        let image_text = match task {
            WritingTask::Task1 => request.image_text(),
            WritingTask::Task2 => None,
        };

        let per_criterion = match self.score_all(&ctx, &essay, request, image_text).await {
            Ok(per_criterion) => per_criterion,
            Err(e) => {
                error!("{} → {}: {}", ctx, PipelineStage::CriterionFailed, e);
                return Err(e);
            }
        };
        info!("{} → {}", ctx, PipelineStage::Scored);

        let score = aggregate(&per_criterion);
        info!(
            "{} → {}: overall {:.1} (TR {:.1} / CC {:.1} / LR {:.1} / GRA {:.1})",
            ctx,
            PipelineStage::Aggregated,
            score.overall,
            per_criterion.task_response.band,
            per_criterion.coherence_cohesion.band,
            per_criterion.lexical_resource.band,
            per_criterion.grammar.band
        );

        let synthesis = synthesize(self.client.as_ref(), task, &essay, &per_criterion).await?;
        info!(
            "{} → {}: {} 条建议",
            ctx,
            PipelineStage::Synthesized,
            synthesis.suggestions.len()
        );

        let meta = EvaluationMeta {
            attempt_id: request.attempt_id.clone(),
            task,
            scale: SCORE_SCALE.to_string(),
            model_version: self.client.model_name().to_string(),
            evaluated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            word_count: essay.word_count,
        };

        info!("{} → {}", ctx, PipelineStage::Done);
        Ok(OverallResult {
            score,
            per_criterion,
            overall_feedback: synthesis.overall_feedback,
            suggestions: synthesis.suggestions,
            meta,
        })
    }

    /// 四个评分项并行
    async fn score_all(
        &self,
        ctx: &EvaluationCtx,
        essay: &EssayStructure,
        request: &EvaluationRequest,
        image_text: Option<&str>,
    ) -> AppResult<PerCriterion> {
        let client = self.client.as_ref();
        let flow = CriterionFlow::new(client, ctx);
        let task = ctx.task;

        let coherence = CoherenceStage::new(task);
        let lexical = LexicalStage::new(task);
        let grammar = GrammarStage::new(task);

        let task_branch = async {
            let spec = infer_task_spec(
                client,
                task,
                Some(request.essay_prompt.as_str()),
                &request.raw_answer_text,
                image_text,
            )
            .await
            .map_err(|e| AppError::criterion_failed(Criterion::TaskResponse, e))?;
            info!(
                "{} 题目类型: {} (置信度 {:.2}, 检查项 {})",
                ctx,
                spec.task_type.as_str(),
                spec.confidence,
                spec.checklist.len()
            );
            if spec.confidence < LOW_CONFIDENCE {
                warn!(
                    "{} 题目类型置信度较低，备选: {:?}",
                    ctx,
                    spec.alternatives
                        .iter()
                        .map(|a| a.task_type.as_str())
                        .collect::<Vec<_>>()
                );
            }
            let stage = TaskStage::new(task, spec, image_text);
            flow.run(&stage, essay).await
        };

        let (task_response, coherence_cohesion, lexical_resource, grammar) = futures::try_join!(
            task_branch,
            flow.run(&coherence, essay),
            flow.run(&lexical, essay),
            flow.run(&grammar, essay),
        )?;

        Ok(PerCriterion {
            task_response,
            coherence_cohesion,
            lexical_resource,
            grammar,
        })
    }
}
