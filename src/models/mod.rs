pub mod criterion;
pub mod essay;
pub mod evidence;
pub mod loaders;
pub mod request;
pub mod result;
pub mod score;
pub mod task_spec;

pub use criterion::{Criterion, WritingTask};
pub use essay::{EssayStructure, FormatFields, Paragraph, Sentence};
pub use loaders::{load_all_requests, load_request};
pub use request::EvaluationRequest;
pub use result::{
    EvaluationMeta, ModelEssay, OverallFeedback, OverallResult, OverallScore, Suggestion,
    SuggestionCategory, SCORE_SCALE,
};
pub use score::{CriterionFeedback, CriterionScore, PerCriterion};
pub use task_spec::{ChecklistItem, TaskSpec, TaskSpecAlternative, TaskType};
