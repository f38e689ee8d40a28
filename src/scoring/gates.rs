//! 封顶规则
//!
//! 封顶在 Rust 中确定性地执行：模型给出的分数只是提案，
//! 最终分数 = min(提案, 所有生效封顶中的最小值)。

use serde::Serialize;

use super::band::anchor_for;
use crate::models::evidence::{
    CoherenceEvidence, FlowClarity, GrammarEvidence, Impact, Level, LexicalEvidence, RangeLevel,
    StructureRange, TaskEvidence,
};
use crate::models::{FormatFields, TaskSpec, WritingTask};

/// 不超过这个词数的作答在所有评分项上都是 1 分
pub const MINIMAL_RESPONSE_WORDS: usize = 20;

/// 一条生效的封顶
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gate {
    pub cap: f64,
    pub reason: String,
}

impl Gate {
    pub fn new(cap: f64, reason: impl Into<String>) -> Self {
        Self {
            cap,
            reason: reason.into(),
        }
    }
}

/// 所有封顶中最严格的一个
pub fn effective_cap(gates: &[Gate]) -> Option<f64> {
    gates.iter().map(|g| g.cap).reduce(f64::min)
}

/// 封顶后的分数
#[derive(Debug, Clone, PartialEq)]
pub struct CappedBand {
    pub band: f64,
    pub band_anchor: String,
    pub applied: Vec<String>,
}

/// 应用封顶
///
/// 只有真正压低了分数的规则才记录在 `applied` 中；被压低时锚点按新分数重新推导。
pub fn apply_caps(band: f64, band_anchor: &str, gates: &[Gate]) -> CappedBand {
    match effective_cap(gates) {
        Some(cap) if band > cap => CappedBand {
            band: cap,
            band_anchor: anchor_for(cap),
            applied: gates
                .iter()
                .filter(|g| g.cap < band)
                .map(|g| format!("≤{:.1}: {}", g.cap, g.reason))
                .collect(),
        },
        _ => CappedBand {
            band,
            band_anchor: band_anchor.to_string(),
            applied: Vec::new(),
        },
    }
}

/// 所有评分项共用的规则
pub fn common_gates(format: &FormatFields) -> Vec<Gate> {
    let mut gates = Vec::new();
    if format.word_count <= MINIMAL_RESPONSE_WORDS {
        gates.push(Gate::new(
            1.0,
            format!("response has only {} words", format.word_count),
        ));
    }
    gates
}

/// 影响理解的错误 → 最高 5 分
fn impedes_gate(overall: Impact, impeding_count: usize) -> Option<Gate> {
    if overall == Impact::Impedes || impeding_count >= 2 {
        Some(Gate::new(
            5.0,
            format!(
                "errors impede communication (overall={:?}, impeding findings={})",
                overall, impeding_count
            ),
        ))
    } else {
        None
    }
}

/// Task Response / Task Achievement
pub fn task_gates(
    task: WritingTask,
    format: &FormatFields,
    spec: &TaskSpec,
    evidence: &TaskEvidence,
) -> Vec<Gate> {
    let mut gates = common_gates(format);

    if format.word_count < task.min_words() {
        gates.push(Gate::new(
            5.0,
            format!(
                "{} words is below the {} minimum of {}",
                format.word_count,
                task,
                task.min_words()
            ),
        ));
    }
    if format.has_bullets {
        gates.push(Gate::new(5.0, "bullet-point format"));
    }

    let uncovered = evidence.uncovered_items(spec);
    if !uncovered.is_empty() {
        gates.push(Gate::new(
            6.0,
            format!("required checklist items not covered: {}", uncovered.join(", ")),
        ));
    }

    match evidence {
        TaskEvidence::Task1(ev) => {
            if ev.overview_sentence_ids.is_empty() {
                gates.push(Gate::new(6.0, "no overview sentence identified"));
            }
            if ev.inaccurate_or_unsupported_claims.len() >= 2 {
                gates.push(Gate::new(
                    6.0,
                    format!(
                        "{} inaccurate or unsupported claims",
                        ev.inaccurate_or_unsupported_claims.len()
                    ),
                ));
            }
        }
        TaskEvidence::Task2(ev) => {
            if ev.position_sentence_ids.is_empty() {
                gates.push(Gate::new(6.0, "no position sentence identified"));
            }
        }
    }
    gates
}

/// Coherence and Cohesion
pub fn coherence_gates(format: &FormatFields, evidence: &CoherenceEvidence) -> Vec<Gate> {
    let mut gates = common_gates(format);

    let major = evidence.major_issue_count();
    if evidence.overall_flow == FlowClarity::Unclear || major >= 2 {
        gates.push(Gate::new(
            5.0,
            format!(
                "flow is {:?} with {} major issues",
                evidence.overall_flow, major
            ),
        ));
    }
    let linking = evidence.connector_or_reference_issue_count();
    if linking >= 3 {
        gates.push(Gate::new(
            7.0,
            format!("{} connector or reference issues", linking),
        ));
    }
    gates
}

/// Lexical Resource
pub fn lexical_gates(format: &FormatFields, evidence: &LexicalEvidence) -> Vec<Gate> {
    let mut gates = common_gates(format);
    let summaries = &evidence.summaries;

    gates.extend(impedes_gate(
        summaries.error_impact_overall,
        evidence.impeding_error_count(),
    ));
    if matches!(
        summaries.range_level,
        RangeLevel::Limited | RangeLevel::ExtremelyLimited
    ) && summaries.precision_level == Level::Low
    {
        gates.push(Gate::new(6.0, "limited range with low precision"));
    }
    gates
}

/// Grammatical Range and Accuracy
pub fn grammar_gates(format: &FormatFields, evidence: &GrammarEvidence) -> Vec<Gate> {
    let mut gates = common_gates(format);
    let summaries = &evidence.summaries;

    gates.extend(impedes_gate(
        summaries.error_impact_overall,
        evidence.impeding_error_count(),
    ));
    if matches!(
        summaries.structure_range,
        StructureRange::Limited | StructureRange::VeryLimited
    ) && summaries.complex_sentence_share == Level::Low
    {
        gates.push(Gate::new(6.0, "limited structures with few complex sentences"));
    }
    gates
}
