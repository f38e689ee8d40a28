use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, InputError};

/// 雅思写作题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingTask {
    /// 小作文：图表 / 流程 / 地图描述
    Task1,
    /// 大作文：议论文
    Task2,
}

impl WritingTask {
    /// 题型要求的最低词数
    pub fn min_words(&self) -> usize {
        match self {
            WritingTask::Task1 => 150,
            WritingTask::Task2 => 250,
        }
    }

    /// 第一个评分项的名称（Task 1 为 TA，Task 2 为 TR）
    pub fn task_criterion_name(&self) -> &'static str {
        match self {
            WritingTask::Task1 => "Task Achievement",
            WritingTask::Task2 => "Task Response",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WritingTask::Task1 => "task_1",
            WritingTask::Task2 => "task_2",
        }
    }
}

impl Display for WritingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WritingTask {
    type Err = AppError;

    /// 接受 `task_1` / `task1` / `Task 1` / `1` 等写法
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "task1" | "1" => Ok(WritingTask::Task1),
            "task2" | "2" => Ok(WritingTask::Task2),
            _ => Err(InputError::UnsupportedTaskType {
                value: s.to_string(),
            }
            .into()),
        }
    }
}

/// 四个评分项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Task Response / Task Achievement
    TaskResponse,
    /// Coherence and Cohesion
    CoherenceCohesion,
    /// Lexical Resource
    LexicalResource,
    /// Grammatical Range and Accuracy
    Grammar,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::TaskResponse,
        Criterion::CoherenceCohesion,
        Criterion::LexicalResource,
        Criterion::Grammar,
    ];

    /// 机器可读的键，同时用作 LLM 调用标签的前缀
    pub fn key(&self) -> &'static str {
        match self {
            Criterion::TaskResponse => "task_response",
            Criterion::CoherenceCohesion => "coherence_cohesion",
            Criterion::LexicalResource => "lexical_resource",
            Criterion::Grammar => "grammar",
        }
    }

    pub fn evidence_label(&self) -> String {
        format!("{}_evidence", self.key())
    }

    pub fn score_label(&self) -> String {
        format!("{}_score", self.key())
    }
}

impl Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Criterion::TaskResponse => "Task Response",
            Criterion::CoherenceCohesion => "Coherence and Cohesion",
            Criterion::LexicalResource => "Lexical Resource",
            Criterion::Grammar => "Grammatical Range and Accuracy",
        };
        write!(f, "{}", name)
    }
}
