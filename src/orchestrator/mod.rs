//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量作文处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载评估请求（Vec<EvaluationRequest>）
//! - 控制并发数量（Semaphore）
//! - 写出评估结果和失败原因
//! - 输出全局统计信息
//!
//! ### `essay_evaluator` - 单篇作文评估器
//! - 输入校验与作文结构化
//! - 四个评分项并行，任一失败即整体失败
//! - 汇总、综合反馈、组装最终结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<EvaluationRequest>)
//!     ↓
//! essay_evaluator (处理单篇作文)
//!     ↓
//! workflow::CriterionFlow (处理单个评分项)
//!     ↓
//! services (能力层：结构化 / 证据 / 打分 / 综合)
//!     ↓
//! clients (LLM 客户端)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，essay_evaluator 管单篇
//! 2. **资源隔离**：只有编排层持有 LLM 客户端
//! 3. **向下依赖**：编排层 → workflow → services → clients
//! 4. **无业务逻辑**：只做调度和统计，不做具体评分判断

pub mod batch_processor;
pub mod essay_evaluator;

// 重新导出主要类型
pub use batch_processor::{App, ProcessingStats};
pub use essay_evaluator::EssayEvaluator;
