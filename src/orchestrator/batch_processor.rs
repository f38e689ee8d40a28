//! 批量作文评估 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量评估和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：日志文件、LLM 客户端
//! 2. **批量加载**：扫描并加载所有待评估的请求（`Vec<EvaluationRequest>`）
//! 3. **并发控制**：使用 Semaphore 限制同时评估的作文数
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **结果交付**：每篇作文写出 `<attempt_id>.json`，失败写出 `<attempt_id>.error.json`
//! 6. **全局统计**：汇总成功 / 失败数量
//!
//! 单篇失败只计数并记录结构化原因，不会中断整批。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{LlmClient, OpenAiClient};
use crate::config::Config;
use crate::error::{AppResult, FailureReason, FileError};
use crate::models::{load_all_requests, EvaluationRequest};
use crate::orchestrator::essay_evaluator::EssayEvaluator;
use crate::services::ModelEssayWriter;
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_requests_loaded, log_startup,
    print_final_stats,
};

/// 应用主结构
pub struct App<C: LlmClient + 'static> {
    config: Config,
    evaluator: EssayEvaluator<C>,
}

impl App<OpenAiClient> {
    /// 使用配置中的 OpenAI 兼容服务初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;

        let client = OpenAiClient::new(&config).context("创建 LLM 客户端失败")?;
        log_startup(config.max_concurrent_essays, client.model_name());

        Ok(Self::with_client(config, Arc::new(client)))
    }
}

impl<C: LlmClient + 'static> App<C> {
    /// 使用指定的 LLM 客户端创建应用
    pub fn with_client(config: Config, client: Arc<C>) -> Self {
        Self {
            config,
            evaluator: EssayEvaluator::new(client),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        info!("\n📁 正在扫描待评估的作文...");
        let requests = load_all_requests(&self.config.request_folder)
            .await
            .with_context(|| format!("加载请求目录失败: {}", self.config.request_folder))?;

        if requests.is_empty() {
            warn!("⚠️ 没有找到待评估的TOML文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        tokio::fs::create_dir_all(&self.config.output_folder)
            .await
            .with_context(|| format!("创建输出目录失败: {}", self.config.output_folder))?;

        log_requests_loaded(requests.len(), self.config.max_concurrent_essays);

        let stats = self.process_all(requests).await?;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_folder,
        );
        Ok(stats)
    }

    /// 分批评估所有作文
    async fn process_all(&self, requests: Vec<EvaluationRequest>) -> Result<ProcessingStats> {
        let batch_size = self.config.max_concurrent_essays;
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = requests.len();
        let total_batches = total.div_ceil(batch_size);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in requests.chunks(batch_size).enumerate() {
            let batch_num = batch_idx + 1;
            let batch_start = batch_idx * batch_size;
            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let result = self.process_batch(batch, semaphore.clone()).await?;
            stats.success += result.success;
            stats.failed += result.failed;

            log_batch_complete(batch_num, result.success, result.success + result.failed);
        }

        Ok(stats)
    }

    /// 评估单个批次
    async fn process_batch(
        &self,
        batch: &[EvaluationRequest],
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::with_capacity(batch.len());

        for request in batch {
            let permit = semaphore.clone().acquire_owned().await?;
            let evaluator = self.evaluator.clone();
            let request = request.clone();
            let output_folder = PathBuf::from(&self.config.output_folder);
            let generate_model_essay = self.config.generate_model_essay;
            let attempt_id = request.attempt_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_request(&evaluator, &request, &output_folder, generate_model_essay).await
            });
            handles.push((attempt_id, handle));
        }

        let mut result = BatchResult::default();
        for (attempt_id, handle) in handles {
            match handle.await {
                Ok(true) => result.success += 1,
                Ok(false) => result.failed += 1,
                Err(e) => {
                    error!("[作文 {}] 任务执行失败: {}", attempt_id, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 评估一篇作文并写出结果，返回是否成功
async fn process_request<C: LlmClient>(
    evaluator: &EssayEvaluator<C>,
    request: &EvaluationRequest,
    output_folder: &Path,
    generate_model_essay: bool,
) -> bool {
    let file_stem = sanitize_file_stem(&request.attempt_id);

    let result = match evaluator.evaluate(request).await {
        Ok(result) => result,
        Err(e) => {
            let reason = e.failure_reason();
            error!(
                "[作文 {}] ❌ 评估失败 ({}): {}",
                request.attempt_id, reason.kind, reason.message
            );
            let record = FailureRecord {
                attempt_id: &request.attempt_id,
                reason,
            };
            let path = output_folder.join(format!("{}.error.json", file_stem));
            if let Err(e) = write_json(&path, &record).await {
                error!("[作文 {}] 写入失败原因出错: {}", request.attempt_id, e);
            }
            return false;
        }
    };

    let path = output_folder.join(format!("{}.json", file_stem));
    if let Err(e) = write_json(&path, &result).await {
        error!("[作文 {}] ❌ 写入结果失败: {}", request.attempt_id, e);
        return false;
    }
    info!(
        "[作文 {}] ✅ overall {:.1} → {}",
        request.attempt_id,
        result.score.overall,
        path.display()
    );

    // 范文失败不影响评估结果
    if generate_model_essay {
        let writer = ModelEssayWriter::new(evaluator.client());
        match writer.generate(request, Some(&result)).await {
            Ok(essay) => {
                let path = output_folder.join(format!("{}.model_essay.json", file_stem));
                if let Err(e) = write_json(&path, &essay).await {
                    warn!("[作文 {}] 写入范文失败: {}", request.attempt_id, e);
                }
            }
            Err(e) => warn!("[作文 {}] ⚠️ 范文生成失败: {}", request.attempt_id, e),
        }
    }

    true
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|source| FileError::WriteFailed {
            path: path.display().to_string(),
            source,
        })?;
    Ok(())
}

/// attempt_id 中不适合做文件名的字符替换为 `_`
pub fn sanitize_file_stem(attempt_id: &str) -> String {
    let stem: String = attempt_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "attempt".to_string()
    } else {
        stem
    }
}

/// 失败时写出的记录
#[derive(Debug, Serialize)]
struct FailureRecord<'a> {
    attempt_id: &'a str,
    #[serde(flatten)]
    reason: FailureReason,
}

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}
