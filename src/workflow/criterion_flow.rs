//! 单个评分项的处理流程 - 流程层
//!
//! 核心职责：定义"一个评分项"的完整处理流程
//!
//! 流程顺序：
//! 1. 证据提取 → 解析 → 引用校验
//! 2. 计算封顶规则
//! 3. 打分 → 解析 → 锚点校验 → 强制封顶
//!
//! 打分调用一定在证据可用之后才发出；任何一步失败都包装为该评分项的失败。

use tracing::{debug, info};

use crate::clients::{CompletionRequest, LlmClient};
use crate::error::{AppError, AppResult};
use crate::models::{CriterionScore, EssayStructure};
use crate::services::criteria::{finalize_score, CriterionStage, ScorerResponse};
use crate::services::json_contract::parse_llm_json;
use crate::utils::logging::truncate_text;
use crate::workflow::evaluation_ctx::{EvaluationCtx, PipelineStage};

/// 评分项处理流程
///
/// - 不持有资源，只借用 LLM 客户端
/// - 决定调用顺序，具体提示词和校验由 `CriterionStage` 提供
pub struct CriterionFlow<'a, C: LlmClient> {
    client: &'a C,
    ctx: &'a EvaluationCtx,
}

impl<'a, C: LlmClient> CriterionFlow<'a, C> {
    pub fn new(client: &'a C, ctx: &'a EvaluationCtx) -> Self {
        Self { client, ctx }
    }

    pub async fn run<S: CriterionStage>(
        &self,
        stage: &S,
        essay: &EssayStructure,
    ) -> AppResult<CriterionScore> {
        let criterion = stage.criterion();
        self.run_inner(stage, essay)
            .await
            .map_err(|e| AppError::criterion_failed(criterion, e))
    }

    async fn run_inner<S: CriterionStage>(
        &self,
        stage: &S,
        essay: &EssayStructure,
    ) -> AppResult<CriterionScore> {
        let criterion = stage.criterion();

        // ========== 1. 证据提取 ==========
        let evidence_label = criterion.evidence_label();
        debug!("{} {}: 开始提取证据", self.ctx, criterion);
        let request = CompletionRequest::new(&evidence_label, stage.evidence_messages(essay));
        let raw = self.client.complete(request).await?;
        debug!(
            "{} {}: {}",
            self.ctx,
            evidence_label,
            truncate_text(&raw, 300)
        );

        let evidence = stage.parse_evidence(&raw)?;
        stage.validate_evidence(&evidence, essay)?;
        debug!(
            "{} {} → {}",
            self.ctx,
            criterion,
            PipelineStage::EvidenceExtracted
        );

        // ========== 2. 封顶 ==========
        let gates = stage.gates(&evidence, essay);
        if !gates.is_empty() {
            info!(
                "{} {}: {} 条封顶规则生效",
                self.ctx,
                criterion,
                gates.len()
            );
        }

        // ========== 3. 打分 ==========
        let score_label = criterion.score_label();
        let request = CompletionRequest::new(
            &score_label,
            stage.score_messages(essay, &evidence, &gates),
        );
        let raw = self.client.complete(request).await?;
        debug!("{} {}: {}", self.ctx, score_label, truncate_text(&raw, 300));

        let response: ScorerResponse = parse_llm_json(&score_label, &raw)?;
        let score = finalize_score(&score_label, response, &gates, essay)?;

        info!(
            "{} ✓ {}: {:.1} (锚点 {})",
            self.ctx, criterion, score.band, score.band_anchor
        );
        Ok(score)
    }
}
