use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult, SchemaViolation};

/// 句子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// 形如 `P2S3`
    pub sid: String,
    /// 原文中的精确子串
    pub text: String,
}

/// 段落
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// 形如 `P2`
    pub pid: String,
    pub sentences: Vec<Sentence>,
}

/// 作文的确定性分段分句结果
///
/// 后续所有阶段都只通过 sid / pid 引用原文。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayStructure {
    pub word_count: usize,
    pub has_bullets: bool,
    pub paragraphs: Vec<Paragraph>,
}

/// 格式相关的确定性特征（交给打分阶段和门槛规则）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatFields {
    pub word_count: usize,
    pub has_bullets: bool,
    pub paragraph_count: usize,
}

impl EssayStructure {
    pub fn empty() -> Self {
        Self {
            word_count: 0,
            has_bullets: false,
            paragraphs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0 || self.paragraphs.is_empty()
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn sentence_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.sentences.len()).sum()
    }

    /// 按阅读顺序遍历所有句子
    pub fn sentences(&self) -> impl Iterator<Item = &Sentence> {
        self.paragraphs.iter().flat_map(|p| p.sentences.iter())
    }

    pub fn sentence(&self, sid: &str) -> Option<&Sentence> {
        self.sentences().find(|s| s.sid == sid)
    }

    pub fn paragraph(&self, pid: &str) -> Option<&Paragraph> {
        self.paragraphs.iter().find(|p| p.pid == pid)
    }

    pub fn format_fields(&self) -> FormatFields {
        FormatFields {
            word_count: self.word_count,
            has_bullets: self.has_bullets,
            paragraph_count: self.paragraph_count(),
        }
    }

    /// 传给 LLM 的结构化表示
    pub fn to_prompt_json(&self) -> serde_json::Value {
        json!({
            "word_count": self.word_count,
            "has_bullets": self.has_bullets,
            "paragraph_count": self.paragraph_count(),
            "paragraphs": self.paragraphs,
        })
    }

    /// 用于校验 LLM 输出引用的辅助对象
    pub fn checker<'a>(&'a self, label: &'a str) -> RefChecker<'a> {
        RefChecker { essay: self, label }
    }
}

/// 引用校验器
///
/// 所有证据里的 sid / pid / span 都必须能在原文结构中找到，
/// 否则返回 `SchemaViolation`。
pub struct RefChecker<'a> {
    essay: &'a EssayStructure,
    label: &'a str,
}

impl<'a> RefChecker<'a> {
    pub fn label(&self) -> &str {
        self.label
    }

    pub fn sid(&self, sid: &str) -> AppResult<&'a Sentence> {
        self.essay
            .sentence(sid)
            .ok_or_else(|| AppError::unknown_sid(self.label, sid))
    }

    pub fn sids<S: AsRef<str>>(&self, sids: &[S]) -> AppResult<()> {
        for sid in sids {
            self.sid(sid.as_ref())?;
        }
        Ok(())
    }

    pub fn opt_sid(&self, sid: Option<&str>) -> AppResult<()> {
        match sid {
            Some(sid) => self.sid(sid).map(|_| ()),
            None => Ok(()),
        }
    }

    pub fn pid(&self, pid: &str) -> AppResult<&'a Paragraph> {
        self.essay.paragraph(pid).ok_or_else(|| {
            AppError::Schema(SchemaViolation::UnknownPid {
                label: self.label.to_string(),
                pid: pid.to_string(),
            })
        })
    }

    /// 片段必须是对应句子的精确子串
    pub fn span(&self, sid: &str, span: &str) -> AppResult<()> {
        let sentence = self.sid(sid)?;
        if span.is_empty() || !sentence.text.contains(span) {
            return Err(AppError::Schema(SchemaViolation::SpanNotInSentence {
                label: self.label.to_string(),
                sid: sid.to_string(),
                span: span.to_string(),
            }));
        }
        Ok(())
    }

    pub fn non_empty(&self, field: &str, value: &str) -> AppResult<()> {
        if value.trim().is_empty() {
            return Err(AppError::invalid_value(self.label, field, "不能为空"));
        }
        Ok(())
    }
}
