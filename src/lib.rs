//! # IELTS Writing Eval
//!
//! 基于 LLM 的雅思写作评分流水线
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有 LLM 连接，只暴露"补全"能力
//! - `LlmClient` - 通过构造函数注入，测试时可替换
//! - `OpenAiClient` - OpenAI 兼容服务的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个能力只期望一种 JSON 结构
//! - `essay_structurer` - 切分段落 / 句子并分配 `P{n}S{m}` 编号
//! - `task_spec_inference` - 推断题目类型与检查项
//! - `criteria` - 四个评分项的证据提取与打分
//! - `overall_feedback` - 跨评分项的综合反馈与修改建议
//! - `model_essay` - 范文生成
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个评分项"的完整处理流程
//! - `EvaluationCtx` - 上下文封装（attempt_id + task）
//! - `CriterionFlow` - 流程编排（证据 → 校验 → 封顶 → 打分）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/essay_evaluator` - 单篇作文评估的状态机，四个评分项并行
//! - `orchestrator/batch_processor` - 批量评估，管理并发和结果输出
//!
//! 分数计算（半分取整、封顶、总分）集中在 `scoring/`，全部是纯函数。
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod scoring;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{LlmClient, OpenAiClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{EvaluationRequest, OverallResult};
pub use orchestrator::{App, EssayEvaluator};
pub use workflow::{CriterionFlow, EvaluationCtx};
