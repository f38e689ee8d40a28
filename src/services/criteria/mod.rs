//! 四个评分项的证据提取与打分 - 能力层
//!
//! 每个评分项都是"两次 LLM 调用"：
//! 1. 证据提取：只输出带句子 ID 的分类证据，不出分
//! 2. 打分：根据证据和格式特征给出锚点分与反馈
//!
//! 封顶规则既写进打分提示词，也在 [`finalize_score`] 中由 Rust 强制执行。

pub mod coherence;
pub mod grammar;
pub mod lexical;
pub mod task;

pub use coherence::CoherenceStage;
pub use grammar::GrammarStage;
pub use lexical::LexicalStage;
pub use task::TaskStage;

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::json_contract::to_prompt_json;
use crate::clients::ChatMessage;
use crate::error::{AppError, AppResult};
use crate::models::{Criterion, CriterionFeedback, CriterionScore, EssayStructure};
use crate::scoring::band::{band_matches_anchor, parse_anchor};
use crate::scoring::{apply_caps, is_valid_band, Gate};

/// 反馈中最多建议引用的句子数
const MAX_CITED_SIDS: usize = 2;

/// 单个评分项的两段式能力
///
/// 实现方只负责提示词、证据校验和封顶规则；调用顺序由 `CriterionFlow` 决定。
pub trait CriterionStage: Send + Sync {
    type Evidence: Serialize + Send + Sync;

    fn criterion(&self) -> Criterion;

    /// 证据提取提示词
    fn evidence_messages(&self, essay: &EssayStructure) -> Vec<ChatMessage>;

    /// 解析证据（缺字段、枚举越界 → `SchemaViolation`）
    fn parse_evidence(&self, response: &str) -> AppResult<Self::Evidence>;

    /// 证据中的引用必须都能在原文结构中找到
    fn validate_evidence(&self, evidence: &Self::Evidence, essay: &EssayStructure) -> AppResult<()>;

    /// 根据证据确定性地计算生效的封顶
    fn gates(&self, evidence: &Self::Evidence, essay: &EssayStructure) -> Vec<Gate>;

    /// 打分提示词
    fn score_messages(
        &self,
        essay: &EssayStructure,
        evidence: &Self::Evidence,
        gates: &[Gate],
    ) -> Vec<ChatMessage>;
}

/// 打分阶段的原始响应
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerResponse {
    pub band: f64,
    #[serde(deserialize_with = "deserialize_anchor")]
    pub band_anchor: String,
    pub feedback: CriterionFeedback,
}

/// 锚点可能是字符串 "7"，也可能是数字 7 / 7.0
fn deserialize_anchor<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct AnchorVisitor;

    impl<'de> Visitor<'de> for AnchorVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer band anchor")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.fract() == 0.0 {
                Ok(format!("{}", value as i64))
            } else {
                Err(E::custom(format!("band anchor must be a whole band, got {}", value)))
            }
        }
    }

    deserializer.deserialize_any(AnchorVisitor)
}

/// 校验打分响应并应用封顶
///
/// - band 必须在 0–9 之间且为 0.5 的整数倍，与锚点相差不超过半分
/// - 反馈固定为 2 个优点、1 个不足、1 个下一步，且都不为空
/// - 反馈中引用的句子 ID 必须存在
pub fn finalize_score(
    label: &str,
    response: ScorerResponse,
    gates: &[Gate],
    essay: &EssayStructure,
) -> AppResult<CriterionScore> {
    let ScorerResponse {
        band,
        band_anchor,
        feedback,
    } = response;

    if !is_valid_band(band) {
        return Err(AppError::invalid_value(
            label,
            "band",
            format!("{} 不是 0–9 之间的半分", band),
        ));
    }
    let anchor = parse_anchor(&band_anchor).ok_or_else(|| {
        AppError::invalid_value(label, "band_anchor", format!("'{}' 不是 1–9 的整数", band_anchor))
    })?;
    if !band_matches_anchor(band, anchor) {
        return Err(AppError::invalid_value(
            label,
            "band",
            format!("{} 与锚点 {} 相差超过半分", band, anchor),
        ));
    }

    validate_feedback(label, &feedback, essay)?;

    let capped = apply_caps(band, &anchor.to_string(), gates);
    if !capped.applied.is_empty() {
        info!(
            "{}: 模型给出 {:.1}，封顶后为 {:.1} ({})",
            label,
            band,
            capped.band,
            capped.applied.join("; ")
        );
    }

    Ok(CriterionScore {
        band: capped.band,
        band_anchor: capped.band_anchor,
        feedback,
        caps_applied: capped.applied,
    })
}

/// 反馈形状与引用校验
pub fn validate_feedback(
    label: &str,
    feedback: &CriterionFeedback,
    essay: &EssayStructure,
) -> AppResult<()> {
    let checker = essay.checker(label);
    checker.non_empty("feedback.summary", &feedback.summary)?;
    checker.non_empty("feedback.next_step", &feedback.next_step)?;

    if feedback.strengths.len() != 2 {
        return Err(AppError::invalid_value(
            label,
            "feedback.strengths",
            format!("需要 2 条，实际 {} 条", feedback.strengths.len()),
        ));
    }
    if feedback.weaknesses.len() != 1 {
        return Err(AppError::invalid_value(
            label,
            "feedback.weaknesses",
            format!("需要 1 条，实际 {} 条", feedback.weaknesses.len()),
        ));
    }
    for item in feedback.strengths.iter().chain(&feedback.weaknesses) {
        checker.non_empty("feedback", item)?;
    }

    let texts = std::iter::once(&feedback.summary)
        .chain(&feedback.strengths)
        .chain(&feedback.weaknesses)
        .chain(std::iter::once(&feedback.next_step));
    let mut cited = BTreeSet::new();
    for text in texts {
        cited.extend(cited_sids(text));
    }
    for sid in &cited {
        checker.sid(sid)?;
    }
    if cited.len() > MAX_CITED_SIDS {
        warn!("{}: 反馈引用了 {} 个句子 ID", label, cited.len());
    }
    Ok(())
}

/// 文本中出现的句子 ID
pub fn cited_sids(text: &str) -> Vec<String> {
    match sid_regex() {
        Some(re) => re.find_iter(text).map(|m| m.as_str().to_string()).collect(),
        None => Vec::new(),
    }
}

fn sid_regex() -> Option<&'static Regex> {
    static SID_RE: OnceLock<Option<Regex>> = OnceLock::new();
    SID_RE
        .get_or_init(|| match Regex::new(r"\bP\d+S\d+\b") {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("句子 ID 正则无效: {}", e);
                None
            }
        })
        .as_ref()
}

/// 打分提示词中列出的生效封顶
pub(crate) fn gates_section(gates: &[Gate]) -> String {
    if gates.is_empty() {
        return "Gates in force: none.".to_string();
    }
    let lines = gates
        .iter()
        .map(|g| format!("- band CANNOT exceed {:.1}: {}", g.cap, g.reason))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Gates in force (computed from the evidence, already binding):\n{}",
        lines
    )
}

/// 所有打分阶段共用的输出格式
pub(crate) const SCORER_OUTPUT_RULES: &str = r#"BAND SELECTION PROCEDURE (must follow):
Step 1) Apply every gate in force. No later step may exceed a gate.
Step 2) Choose the single closest whole-number ANCHOR band (1-9) by matching the evidence to the anchors above.
Step 3) Use +0.5 / -0.5 ONLY when the evidence is clearly between two adjacent anchors.

OUTPUT JSON ONLY. No markdown. No extra keys. Must match schema exactly:
{
    "band": 0.0,
    "band_anchor": "7",
    "feedback": {
        "summary": "string",
        "strengths": ["string", "string"],
        "weaknesses": ["string"],
        "next_step": "string"
    }
}

Feedback requirements:
- band is a multiple of 0.5 within one half band of band_anchor.
- summary: 2-3 examiner-style sentences.
- strengths: exactly 2 items. weaknesses: exactly 1 item (the main limiting factor).
- next_step: exactly 1 actionable sentence to reach the next band.
- You MAY cite at most 1-2 sentence ids (e.g. P2S3) in total. Never cite ids that are not in essay_structure."#;

/// 所有证据提取阶段共用的约束
pub(crate) const EVIDENCE_RULES: &str = r#"RULES:
- You are NOT grading. You are extracting auditable evidence. Never output a band or numeric score.
- Use ONLY the provided sentences as evidence. Do NOT invent or paraphrase new facts.
- Every finding must reference sentence ids (sid) that exist in essay_structure.
- Every span must be copied EXACTLY from the referenced sentence.
- Output MUST be valid JSON ONLY. No markdown. No explanations. Use ONLY the keys in the schema below."#;

/// 拼接用户消息：每段是 `name:\n<json>`
pub(crate) fn labelled_sections(sections: &[(&str, String)]) -> String {
    sections
        .iter()
        .map(|(name, body)| format!("{}:\n{}", name, body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 打分阶段共用的用户消息：格式特征 + 证据
pub(crate) fn score_user_message<E: Serialize>(essay: &EssayStructure, evidence: &E) -> String {
    labelled_sections(&[
        ("format_fields", to_prompt_json(&essay.format_fields())),
        ("auditable_evidence", to_prompt_json(evidence)),
    ])
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{CriterionFeedback, EssayStructure};
    use crate::services::essay_structurer::structure_essay;

    /// 两段、四句的小作文
    pub fn small_essay() -> EssayStructure {
        structure_essay(
            "Many people believe cities are too crowded. I agree with this view.\n\n\
             Traffic is a serious problem. Therefore governments should invest in trains.",
        )
    }

    pub fn feedback() -> CriterionFeedback {
        CriterionFeedback {
            summary: "A clear and relevant response.".to_string(),
            strengths: vec!["Clear position.".to_string(), "Relevant ideas.".to_string()],
            weaknesses: vec!["Limited development in P2S2.".to_string()],
            next_step: "Extend each main idea with a specific example.".to_string(),
        }
    }
}
