pub mod criterion_flow;
pub mod evaluation_ctx;

pub use criterion_flow::CriterionFlow;
pub use evaluation_ctx::{EvaluationCtx, PipelineStage};
