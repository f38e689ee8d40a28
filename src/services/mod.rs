pub mod criteria;
pub mod essay_structurer;
pub mod json_contract;
pub mod model_essay;
pub mod overall_feedback;
pub mod task_spec_inference;

pub use criteria::{CoherenceStage, CriterionStage, GrammarStage, LexicalStage, TaskStage};
pub use essay_structurer::structure_essay;
pub use model_essay::ModelEssayWriter;
pub use overall_feedback::{synthesize, Synthesis};
pub use task_spec_inference::infer_task_spec;
