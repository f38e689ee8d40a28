//! Task Response (Task 2) / Task Achievement (Task 1) 证据

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SentenceNote;
use crate::error::{AppError, AppResult};
use crate::models::essay::{EssayStructure, RefChecker};
use crate::models::task_spec::TaskSpec;

/// 观点段的切题程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaRelevance {
    Direct,
    MostlyDirect,
    PartlyDirect,
    Weak,
    OffTask,
}

/// 论证支撑质量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Task 1 段落描述的特征类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Trend,
    Comparison,
    Extreme,
    Stage,
    LocationChange,
    CategoryBreakdown,
    Other,
}

/// Task 1 数据准确性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyFlag {
    Accurate,
    Unclear,
    LikelyInaccurate,
    Unsupported,
}

/// 检查项 → 覆盖它的句子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageEntry {
    #[serde(default)]
    pub checklist_desc: String,
    pub covered_by_sentence_ids: Vec<String>,
}

/// Task 2 主体段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentParagraph {
    pub pid: String,
    pub topic_sentence_id: Option<String>,
    pub main_idea: String,
    pub supporting_sentence_ids: Vec<String>,
    pub idea_relevance: IdeaRelevance,
    pub support_quality: SupportQuality,
    pub over_generalisation_sentence_ids: Vec<String>,
    pub tie_back_missing_sentence_ids: Vec<String>,
}

/// Task 2 证据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponseEvidence {
    pub position_sentence_ids: Vec<String>,
    pub conclusion_sentence_ids: Vec<String>,
    pub body_paragraphs: Vec<ArgumentParagraph>,
    pub coverage_map: BTreeMap<String, CoverageEntry>,
    pub irrelevant_sentence_ids: Vec<String>,
    pub weak_or_risky_sentence_ids: Vec<SentenceNote>,
    pub under_developed_sentence_ids: Vec<SentenceNote>,
}

/// Task 1 主体段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureParagraph {
    pub pid: String,
    pub topic_sentence_id: Option<String>,
    pub main_feature: String,
    pub supporting_sentence_ids: Vec<String>,
    pub data_or_feature_type: FeatureType,
    pub accuracy_flag: AccuracyFlag,
    #[serde(default)]
    pub accuracy_notes: String,
}

/// Task 1 证据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAchievementEvidence {
    pub intro_sentence_ids: Vec<String>,
    pub overview_sentence_ids: Vec<String>,
    pub body_paragraphs: Vec<FeatureParagraph>,
    pub coverage_map: BTreeMap<String, CoverageEntry>,
    /// 证据较弱的检查项 ID
    pub missing_or_weak_areas: Vec<String>,
    pub speculative_or_irrelevant_sentence_ids: Vec<String>,
    pub inaccurate_or_unsupported_claims: Vec<SentenceNote>,
}

/// 第一个评分项的证据（按题型区分）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TaskEvidence {
    Task1(TaskAchievementEvidence),
    Task2(TaskResponseEvidence),
}

impl TaskEvidence {
    pub fn coverage_map(&self) -> &BTreeMap<String, CoverageEntry> {
        match self {
            TaskEvidence::Task1(ev) => &ev.coverage_map,
            TaskEvidence::Task2(ev) => &ev.coverage_map,
        }
    }

    /// 没有任何句子覆盖的必做检查项
    pub fn uncovered_items<'a>(&self, spec: &'a TaskSpec) -> Vec<&'a str> {
        let coverage = self.coverage_map();
        spec.must_do_items()
            .filter(|item| {
                coverage
                    .get(&item.id)
                    .map_or(true, |entry| entry.covered_by_sentence_ids.is_empty())
            })
            .map(|item| item.id.as_str())
            .collect()
    }

    /// 校验所有引用，并确认 coverage_map 的键与检查项完全一致
    pub fn validate(&self, essay: &EssayStructure, spec: &TaskSpec, label: &str) -> AppResult<()> {
        let checker = essay.checker(label);
        validate_coverage(&checker, self.coverage_map(), spec)?;

        match self {
            TaskEvidence::Task1(ev) => {
                checker.sids(&ev.intro_sentence_ids)?;
                checker.sids(&ev.overview_sentence_ids)?;
                for paragraph in &ev.body_paragraphs {
                    validate_body_paragraph(
                        &checker,
                        &paragraph.pid,
                        paragraph.topic_sentence_id.as_deref(),
                        &paragraph.supporting_sentence_ids,
                    )?;
                    checker.non_empty("main_feature", &paragraph.main_feature)?;
                }
                for id in &ev.missing_or_weak_areas {
                    if !spec.checklist_ids().any(|c| c == id) {
                        return Err(AppError::invalid_value(
                            label,
                            "missing_or_weak_areas",
                            format!("未知检查项 {}", id),
                        ));
                    }
                }
                checker.sids(&ev.speculative_or_irrelevant_sentence_ids)?;
                validate_notes(&checker, &ev.inaccurate_or_unsupported_claims)?;
            }
            TaskEvidence::Task2(ev) => {
                checker.sids(&ev.position_sentence_ids)?;
                checker.sids(&ev.conclusion_sentence_ids)?;
                for paragraph in &ev.body_paragraphs {
                    validate_body_paragraph(
                        &checker,
                        &paragraph.pid,
                        paragraph.topic_sentence_id.as_deref(),
                        &paragraph.supporting_sentence_ids,
                    )?;
                    checker.non_empty("main_idea", &paragraph.main_idea)?;
                    checker.sids(&paragraph.over_generalisation_sentence_ids)?;
                    checker.sids(&paragraph.tie_back_missing_sentence_ids)?;
                }
                checker.sids(&ev.irrelevant_sentence_ids)?;
                validate_notes(&checker, &ev.weak_or_risky_sentence_ids)?;
                validate_notes(&checker, &ev.under_developed_sentence_ids)?;
            }
        }
        Ok(())
    }
}

fn validate_coverage(
    checker: &RefChecker<'_>,
    coverage: &BTreeMap<String, CoverageEntry>,
    spec: &TaskSpec,
) -> AppResult<()> {
    for id in spec.checklist_ids() {
        if !coverage.contains_key(id) {
            return Err(AppError::invalid_value(
                checker.label(),
                "coverage_map",
                format!("缺少检查项 {}", id),
            ));
        }
    }
    for (id, entry) in coverage {
        if !spec.checklist_ids().any(|c| c == id) {
            return Err(AppError::invalid_value(
                checker.label(),
                "coverage_map",
                format!("未知检查项 {}", id),
            ));
        }
        checker.sids(&entry.covered_by_sentence_ids)?;
    }
    Ok(())
}

fn validate_body_paragraph(
    checker: &RefChecker<'_>,
    pid: &str,
    topic_sentence_id: Option<&str>,
    supporting: &[String],
) -> AppResult<()> {
    let paragraph = checker.pid(pid)?;
    if let Some(sid) = topic_sentence_id {
        checker.sid(sid)?;
        if !paragraph.sentences.iter().any(|s| s.sid == sid) {
            return Err(AppError::invalid_value(
                checker.label(),
                "topic_sentence_id",
                format!("{} 不属于段落 {}", sid, pid),
            ));
        }
    }
    checker.sids(supporting)
}

fn validate_notes(checker: &RefChecker<'_>, notes: &[SentenceNote]) -> AppResult<()> {
    for note in notes {
        checker.sid(&note.sid)?;
    }
    Ok(())
}
