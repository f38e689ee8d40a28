use phf::phf_map;
use serde::{Deserialize, Serialize};

use super::criterion::WritingTask;

/// 题目类型（Task 1 与 Task 2 各自是封闭集合，`Unknown` 只用于 Task 1）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    // --- Task 2 ---
    AgreeDisagree,
    DiscussBothViews,
    DiscussBothViewsAndOpinion,
    AdvantagesDisadvantages,
    ProblemSolution,
    TwoPartQuestion,
    // --- Task 1 ---
    LineGraph,
    BarChart,
    PieChart,
    Table,
    ProcessDiagram,
    Map,
    Mixed,
    Unknown,
}

const AGREE_PARTS: &[&str] = &["writer_opinion"];
const BOTH_VIEWS_PARTS: &[&str] = &["view_A", "view_B"];
const BOTH_VIEWS_OPINION_PARTS: &[&str] = &["view_A", "view_B", "writer_opinion"];
const ADVANTAGES_PARTS: &[&str] = &["advantages", "disadvantages"];
const PROBLEM_SOLUTION_PARTS: &[&str] = &["problem", "solution"];
const TWO_PART_PARTS: &[&str] = &["question_1", "question_2"];
const CHART_PARTS: &[&str] = &["overview", "key_features", "comparisons", "accurate_reporting"];
const PROCESS_PARTS: &[&str] = &["overview", "stages", "sequence"];
const MAP_PARTS: &[&str] = &["overview", "locations", "changes", "comparisons"];
const UNKNOWN_PARTS: &[&str] = &["overview", "key_features"];

/// 题目类型 → 必须完成的部分
static REQUIRED_PARTS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "agree_disagree" => AGREE_PARTS,
    "discuss_both_views" => BOTH_VIEWS_PARTS,
    "discuss_both_views_and_opinion" => BOTH_VIEWS_OPINION_PARTS,
    "advantages_disadvantages" => ADVANTAGES_PARTS,
    "problem_solution" => PROBLEM_SOLUTION_PARTS,
    "two_part_question" => TWO_PART_PARTS,
    "line_graph" => CHART_PARTS,
    "bar_chart" => CHART_PARTS,
    "pie_chart" => CHART_PARTS,
    "table" => CHART_PARTS,
    "mixed" => CHART_PARTS,
    "process_diagram" => PROCESS_PARTS,
    "map" => MAP_PARTS,
    "unknown" => UNKNOWN_PARTS,
};

/// 必须部分 → 检查项描述
static PART_DESCRIPTIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "writer_opinion" => "State a clear position and keep it consistent throughout",
    "view_A" => "Discuss the first view with relevant support",
    "view_B" => "Discuss the opposing view with relevant support",
    "advantages" => "Discuss the advantages with relevant support",
    "disadvantages" => "Discuss the disadvantages with relevant support",
    "problem" => "Identify and explain the problems",
    "solution" => "Propose solutions linked to the problems",
    "question_1" => "Answer the first question fully",
    "question_2" => "Answer the second question fully",
    "overview" => "Give a clear overview of the main trends, stages or changes",
    "key_features" => "Select and report the key features",
    "comparisons" => "Make relevant comparisons",
    "accurate_reporting" => "Report data accurately with appropriate figures",
    "stages" => "Describe the main stages of the process",
    "sequence" => "Present the stages in a logical sequence",
    "locations" => "Describe the relevant locations",
    "changes" => "Describe the main changes between the maps",
};

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::AgreeDisagree => "agree_disagree",
            TaskType::DiscussBothViews => "discuss_both_views",
            TaskType::DiscussBothViewsAndOpinion => "discuss_both_views_and_opinion",
            TaskType::AdvantagesDisadvantages => "advantages_disadvantages",
            TaskType::ProblemSolution => "problem_solution",
            TaskType::TwoPartQuestion => "two_part_question",
            TaskType::LineGraph => "line_graph",
            TaskType::BarChart => "bar_chart",
            TaskType::PieChart => "pie_chart",
            TaskType::Table => "table",
            TaskType::ProcessDiagram => "process_diagram",
            TaskType::Map => "map",
            TaskType::Mixed => "mixed",
            TaskType::Unknown => "unknown",
        }
    }

    /// 按 snake_case 名称查找
    pub fn from_name(name: &str) -> Option<TaskType> {
        let name = name.trim();
        ALL_TASK_TYPES.iter().copied().find(|t| t.as_str() == name)
    }

    /// 该类型是否属于给定题型
    pub fn belongs_to(&self, task: WritingTask) -> bool {
        match self {
            TaskType::AgreeDisagree
            | TaskType::DiscussBothViews
            | TaskType::DiscussBothViewsAndOpinion
            | TaskType::AdvantagesDisadvantages
            | TaskType::ProblemSolution
            | TaskType::TwoPartQuestion => task == WritingTask::Task2,
            _ => task == WritingTask::Task1,
        }
    }

    /// 题型允许的全部类型，写进提示词
    pub fn allowed_for(task: WritingTask) -> Vec<TaskType> {
        ALL_TASK_TYPES
            .iter()
            .copied()
            .filter(|t| t.belongs_to(task))
            .collect()
    }

    pub fn required_parts(&self) -> &'static [&'static str] {
        REQUIRED_PARTS.get(self.as_str()).copied().unwrap_or(&[])
    }
}

const ALL_TASK_TYPES: [TaskType; 14] = [
    TaskType::AgreeDisagree,
    TaskType::DiscussBothViews,
    TaskType::DiscussBothViewsAndOpinion,
    TaskType::AdvantagesDisadvantages,
    TaskType::ProblemSolution,
    TaskType::TwoPartQuestion,
    TaskType::LineGraph,
    TaskType::BarChart,
    TaskType::PieChart,
    TaskType::Table,
    TaskType::ProcessDiagram,
    TaskType::Map,
    TaskType::Mixed,
    TaskType::Unknown,
];

/// 检查项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// `C1`, `C2`, ...
    pub id: String,
    pub part: String,
    pub desc: String,
    pub must_do: bool,
}

/// 根据题目类型生成必须部分和检查项
///
/// 检查项与必须部分一一对应，编号从 C1 开始。
pub fn build_checklist(task_type: TaskType) -> (Vec<String>, Vec<ChecklistItem>) {
    let parts = task_type.required_parts();
    let checklist = parts
        .iter()
        .enumerate()
        .map(|(i, part)| ChecklistItem {
            id: format!("C{}", i + 1),
            part: part.to_string(),
            desc: PART_DESCRIPTIONS
                .get(*part)
                .copied()
                .unwrap_or("Address this part of the prompt")
                .to_string(),
            must_do: true,
        })
        .collect();
    (parts.iter().map(|p| p.to_string()).collect(), checklist)
}

/// 备选解读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpecAlternative {
    pub task_type: TaskType,
    pub required_parts: Vec<String>,
    pub checklist: Vec<ChecklistItem>,
    pub confidence: f64,
}

/// 题目要求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_type: TaskType,
    pub required_parts: Vec<String>,
    pub checklist: Vec<ChecklistItem>,
    pub topic_keywords: Vec<String>,
    pub confidence: f64,
    pub alternatives: Vec<TaskSpecAlternative>,
    /// 支撑分类判断的题目原文线索
    pub evidence_signals: Vec<String>,
}

impl TaskSpec {
    /// 由类型直接构建（检查项由本地表生成）
    pub fn for_type(task_type: TaskType, confidence: f64) -> Self {
        let (required_parts, checklist) = build_checklist(task_type);
        Self {
            task_type,
            required_parts,
            checklist,
            topic_keywords: Vec::new(),
            confidence,
            alternatives: Vec::new(),
            evidence_signals: Vec::new(),
        }
    }

    pub fn checklist_ids(&self) -> impl Iterator<Item = &str> {
        self.checklist.iter().map(|c| c.id.as_str())
    }

    pub fn must_do_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.checklist.iter().filter(|c| c.must_do)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opinion_type_requires_own_opinion() {
        let (parts, checklist) = build_checklist(TaskType::DiscussBothViewsAndOpinion);
        assert_eq!(parts, vec!["view_A", "view_B", "writer_opinion"]);
        assert_eq!(checklist.len(), 3);
        assert_eq!(checklist[2].id, "C3");
        assert!(checklist.iter().all(|c| c.must_do));
    }

    #[test]
    fn test_every_type_has_parts_and_descriptions() {
        for task_type in ALL_TASK_TYPES {
            let (parts, checklist) = build_checklist(task_type);
            assert!(!parts.is_empty(), "{:?}", task_type);
            for item in checklist {
                assert!(PART_DESCRIPTIONS.contains_key(item.part.as_str()), "{}", item.part);
            }
        }
    }

    #[test]
    fn test_task_type_membership() {
        assert!(TaskType::ProblemSolution.belongs_to(WritingTask::Task2));
        assert!(!TaskType::ProblemSolution.belongs_to(WritingTask::Task1));
        assert!(TaskType::Map.belongs_to(WritingTask::Task1));
        assert!(TaskType::Unknown.belongs_to(WritingTask::Task1));
        assert!(!TaskType::Unknown.belongs_to(WritingTask::Task2));
        assert_eq!(TaskType::allowed_for(WritingTask::Task2).len(), 6);
        assert_eq!(TaskType::allowed_for(WritingTask::Task1).len(), 8);
    }

    #[test]
    fn test_task_type_serde_names() {
        let json = serde_json::to_string(&TaskType::DiscussBothViewsAndOpinion).unwrap();
        assert_eq!(json, "\"discuss_both_views_and_opinion\"");
        assert_eq!(TaskType::ProcessDiagram.as_str(), "process_diagram");
        assert_eq!(TaskType::from_name(" map "), Some(TaskType::Map));
        assert_eq!(TaskType::from_name("essay"), None);
    }
}
